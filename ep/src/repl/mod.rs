//! Interactive terminal front end
//!
//! A chat loop over a [`Conversation`] and a field-by-field form editor,
//! plus the plain formatting shared with the one-shot commands.

mod editor;
mod session;

pub use editor::edit_form;
pub use session::{ChatRepl, LineAction, SlashCommand, confirm};

use colored::Colorize;

use crate::domain::{ChatRole, ExperimentForm, FormField, Transcript};
use crate::render;

/// Format the form as labeled lines, marking blank fields
pub fn format_form(form: &ExperimentForm) -> String {
    let mut out = String::new();
    for field in FormField::ALL {
        let value = form.get(field);
        let shown = if value.is_empty() {
            "(empty)".dimmed().to_string()
        } else {
            value.to_string()
        };
        out.push_str(&format!("{:>22}: {}\n", field.label().bold(), shown));
    }
    out
}

/// Format every message with a role header and rendered markdown
pub fn format_transcript(transcript: &Transcript) -> String {
    if transcript.is_empty() {
        return format!("{}\n", "No conversation history.".dimmed());
    }

    let mut out = String::new();
    for (i, msg) in transcript.iter().enumerate() {
        let role = match msg.role() {
            ChatRole::User => "You".bright_green().bold(),
            ChatRole::Assistant => "Planner".bright_blue().bold(),
        };
        out.push_str(&format!("{} {}\n", format!("[{}]", i + 1).dimmed(), role));
        out.push_str(&render::to_terminal(msg.content()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatMessage;

    #[test]
    fn test_format_form_lists_all_fields() {
        let mut form = ExperimentForm::default();
        form.set(FormField::Hypothesis, "X increases Y");

        let out = format_form(&form);
        for field in FormField::ALL {
            assert!(out.contains(field.label()), "missing {}", field.label());
        }
        assert!(out.contains("X increases Y"));
        assert!(out.contains("(empty)"));
        assert_eq!(out.lines().count(), 7);
    }

    #[test]
    fn test_format_transcript_empty() {
        let out = format_transcript(&Transcript::new());
        assert!(out.contains("No conversation history."));
    }

    #[test]
    fn test_format_transcript_in_order() {
        let transcript = Transcript::from(vec![
            ChatMessage::assistant("# Plan"),
            ChatMessage::user("Shorten this"),
            ChatMessage::assistant("Short plan"),
        ]);

        let out = format_transcript(&transcript);
        let plan = out.find("Plan").unwrap();
        let question = out.find("Shorten this").unwrap();
        let reply = out.find("Short plan").unwrap();
        assert!(plan < question && question < reply);
        assert!(out.contains("You"));
        assert!(out.contains("Planner"));
    }
}
