//! Field-by-field form editor

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::domain::FormField;
use crate::session::FormState;

/// Walk every field, pre-filled with its saved value
///
/// Each accepted line is persisted immediately, so Ctrl-C keeps what was
/// already entered. Ctrl-D skips the remaining fields.
pub fn edit_form(state: &mut FormState) -> Result<()> {
    debug!("edit_form: called");
    let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

    println!();
    println!("{}", "Experiment Form".bright_cyan().bold());
    println!("Edit each field and press Enter. {} stops early.", "Ctrl-D".yellow());
    println!();

    for field in FormField::ALL {
        println!("{} {}", field.label().bold(), format!("({})", field.hint()).dimmed());
        let current = state.form().get(field).to_string();

        match rl.readline_with_initial(&format!("{} ", ">".bright_green()), (current.as_str(), "")) {
            Ok(line) => {
                let value = line.trim();
                if value != current {
                    debug!(?field, "edit_form: field changed");
                    state.set(field, value);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                println!("{}", "Form editing cancelled; earlier fields were saved.".dimmed());
                return Ok(());
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
        }
    }

    println!("{}", "Form saved.".dimmed());
    Ok(())
}
