//! Experiment Planner
//!
//! CLI entry point for the planner server and the terminal client.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use rustyline::DefaultEditor;
use tracing::{debug, info};

use expplanner::api::{HttpPlannerApi, PlannerApi};
use expplanner::cli::{Cli, Command, generate_after_help, get_log_path};
use expplanner::config::Config;
use expplanner::domain::{ChatRole, FormField};
use expplanner::llm::create_client;
use expplanner::render;
use expplanner::repl::{self, ChatRepl};
use expplanner::server::{self, AppState};
use expplanner::session::{Conversation, FormState, SendError};
use expplanner::store::{FileStorage, Storage};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

/// Client commands own the terminal and log to a file; the server logs to stderr
fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_file: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_file {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let Some(command) = cli.command else {
        Cli::command().after_help(generate_after_help()).print_help()?;
        return Ok(());
    };

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), command.is_client())
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, "Experiment planner loaded config");

    debug!(?command, "main: dispatching command");
    match command {
        Command::Serve { bind } => {
            debug!(?bind, "main: matched Serve command");
            cmd_serve(config, bind).await
        }
        Command::Form { reset } => {
            debug!(reset, "main: matched Form command");
            cmd_form(&config, reset)
        }
        Command::Set { field, value } => {
            debug!(?field, "main: matched Set command");
            cmd_set(&config, field, value)
        }
        Command::Show => cmd_show(&config),
        Command::Plan { no_chat } => {
            debug!(no_chat, "main: matched Plan command");
            cmd_plan(&config, no_chat).await
        }
        Command::Chat { message } => {
            debug!(one_shot = message.is_some(), "main: matched Chat command");
            cmd_chat(&config, message).await
        }
        Command::History => cmd_history(&config),
        Command::Clear { yes } => {
            debug!(yes, "main: matched Clear command");
            cmd_clear(&config, yes)
        }
        Command::Export { html, output } => {
            debug!(html, ?output, "main: matched Export command");
            cmd_export(&config, html, output.as_deref())
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn Storage>> {
    let store = FileStorage::open(&config.client.state_dir)
        .context(format!("Failed to open state directory {}", config.client.state_dir.display()))?;
    Ok(Arc::new(store))
}

fn open_api(config: &Config) -> Result<Arc<dyn PlannerApi>> {
    let api = HttpPlannerApi::from_config(&config.client).context("Failed to create planner API client")?;
    Ok(Arc::new(api))
}

/// Run the HTTP server
async fn cmd_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    debug!("cmd_serve: called");
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    // Fail fast without a credential
    let resolved = config.llm.resolve()?;
    info!(?resolved, "cmd_serve: resolved model client config");
    let llm = create_client(&resolved).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))?;

    let state = AppState::new(llm, config.generation.clone(), config.server.log_payloads)
        .context("Failed to load prompt template")?;
    server::run(state, &config.server).await
}

/// Edit or discard the saved form
fn cmd_form(config: &Config, reset: bool) -> Result<()> {
    debug!(reset, "cmd_form: called");
    let mut state = FormState::restore(open_store(config)?);
    if reset {
        state.reset();
        println!("Form cleared.");
        return Ok(());
    }
    repl::edit_form(&mut state)?;
    print!("{}", repl::format_form(state.form()));
    Ok(())
}

fn cmd_set(config: &Config, field: FormField, value: String) -> Result<()> {
    debug!(?field, "cmd_set: called");
    let mut state = FormState::restore(open_store(config)?);
    state.set(field, value);
    println!("{} updated.", field.label());
    Ok(())
}

fn cmd_show(config: &Config) -> Result<()> {
    debug!("cmd_show: called");
    let state = FormState::restore(open_store(config)?);
    print!("{}", repl::format_form(state.form()));
    Ok(())
}

/// Submit the form, show the plan, seed the conversation
async fn cmd_plan(config: &Config, no_chat: bool) -> Result<()> {
    debug!(no_chat, "cmd_plan: called");
    let store = open_store(config)?;
    let form = FormState::restore(store.clone());
    if form.form().is_blank() {
        println!("{}", "The form is empty; run `ep form` to fill it in.".yellow());
    }

    let api = open_api(config)?;
    println!("{}", "Generating experiment plan...".dimmed());
    let plan = api
        .submit_experiment(form.form())
        .await
        .context("Failed to generate experiment plan")?;

    println!();
    print!("{}", render::to_terminal(&plan));
    println!();

    let mut conversation = Conversation::restore(store);
    if !conversation.seed(&plan) {
        info!(len = conversation.transcript().len(), "cmd_plan: existing conversation kept");
        println!(
            "{}",
            format!(
                "Kept the existing conversation ({} messages). Use `/clear` in the chat or `ep clear` to start over from this plan.",
                conversation.transcript().len()
            )
            .yellow()
        );
    }

    if no_chat {
        return Ok(());
    }
    let mut chat = ChatRepl::new(conversation, api).with_seed(plan);
    chat.run().await
}

/// Send one message, or open the chat REPL
async fn cmd_chat(config: &Config, message: Option<String>) -> Result<()> {
    debug!("cmd_chat: called");
    let mut conversation = Conversation::restore(open_store(config)?);
    let api = open_api(config)?;

    let Some(message) = message else {
        let mut chat = ChatRepl::new(conversation, api);
        return chat.run().await;
    };

    conversation.set_draft(message);
    match conversation.send(api.as_ref()).await {
        Ok(reply) => {
            print!("{}", render::to_terminal(&reply));
            Ok(())
        }
        Err(SendError::Failed(reason)) => Err(eyre::eyre!("Message not sent: {}", reason)),
        Err(e) => Err(e.into()),
    }
}

fn cmd_history(config: &Config) -> Result<()> {
    debug!("cmd_history: called");
    let conversation = Conversation::restore(open_store(config)?);
    print!("{}", repl::format_transcript(conversation.transcript()));
    Ok(())
}

fn cmd_clear(config: &Config, yes: bool) -> Result<()> {
    debug!(yes, "cmd_clear: called");
    let mut conversation = Conversation::restore(open_store(config)?);
    if conversation.transcript().is_empty() {
        println!("{}", "No conversation history.".dimmed());
        return Ok(());
    }

    if !yes {
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        let question = format!("Clear {} messages? [y/N] ", conversation.transcript().len());
        if !repl::confirm(&mut rl, &question)? {
            println!("Kept the conversation.");
            return Ok(());
        }
    }

    conversation.clear();
    println!("Conversation cleared.");
    Ok(())
}

/// Export the latest assistant message as markdown or HTML
fn cmd_export(config: &Config, html: bool, output: Option<&Path>) -> Result<()> {
    debug!(html, "cmd_export: called");
    let conversation = Conversation::restore(open_store(config)?);
    let latest = conversation
        .transcript()
        .iter()
        .rev()
        .find(|m| m.role() == ChatRole::Assistant)
        .ok_or_else(|| eyre::eyre!("Nothing to export; run `ep plan` first"))?;

    let content = if html {
        render::html_document("Experiment Plan", &render::to_html(latest.content()))
    } else {
        let mut md = latest.content().to_string();
        if !md.ends_with('\n') {
            md.push('\n');
        }
        md
    };

    match output {
        Some(path) => {
            fs::write(path, content).context(format!("Failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
