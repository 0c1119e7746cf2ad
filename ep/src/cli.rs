//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::FormField;

/// Experiment Planner - turn a research hypothesis into an experiment plan
#[derive(Parser)]
#[command(
    name = "ep",
    about = "Generate and refine experiment plans with a hosted language model",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the planner HTTP server
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Fill in the experiment form interactively
    Form {
        /// Discard the saved form instead of editing it
        #[arg(long)]
        reset: bool,
    },

    /// Set a single form field
    Set {
        /// Field to set
        #[arg(value_enum)]
        field: FormField,

        /// New value (empty clears the field)
        value: String,
    },

    /// Show the saved form
    Show,

    /// Submit the form and generate an experiment plan
    Plan {
        /// Print the plan and exit without entering chat
        #[arg(long)]
        no_chat: bool,
    },

    /// Continue the conversation about the plan
    Chat {
        /// Send a single message and exit
        message: Option<String>,
    },

    /// Print the conversation transcript
    History,

    /// Clear the conversation transcript
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export the latest plan or reply
    Export {
        /// Render as a standalone HTML document
        #[arg(long)]
        html: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Command {
    /// Whether the command owns the terminal, so logs go to a file
    pub fn is_client(&self) -> bool {
        !matches!(self, Command::Serve { .. })
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("expplanner")
        .join("logs")
        .join("expplanner.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Footer for `--help`
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}
