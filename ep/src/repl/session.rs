//! Chat REPL session

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use super::format_transcript;
use crate::api::PlannerApi;
use crate::domain::ChatRole;
use crate::render;
use crate::session::{Conversation, SendError};

/// Slash commands understood by the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    Clear,
    History,
    Unknown(String),
}

impl SlashCommand {
    /// Parse a line starting with `/`; anything else is a chat message
    pub fn parse(input: &str) -> Option<Self> {
        if !input.starts_with('/') {
            return None;
        }
        let cmd = input.split_whitespace().next().unwrap_or("");
        Some(match cmd {
            "/help" | "/h" => Self::Help,
            "/quit" | "/q" | "/exit" => Self::Quit,
            "/clear" | "/c" => Self::Clear,
            "/history" => Self::History,
            other => Self::Unknown(other.to_string()),
        })
    }
}

/// What one line of input asks the chat loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction<'a> {
    Skip,
    Command(SlashCommand),
    Message(&'a str),
}

impl<'a> LineAction<'a> {
    /// Blank lines are skipped; messages are sent exactly as typed
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Skip;
        }
        match SlashCommand::parse(trimmed) {
            Some(cmd) => Self::Command(cmd),
            None => Self::Message(line),
        }
    }
}

/// Interactive chat over a persisted conversation
pub struct ChatRepl {
    conversation: Conversation,
    api: Arc<dyn PlannerApi>,
    seed: Option<String>,
}

impl ChatRepl {
    pub fn new(conversation: Conversation, api: Arc<dyn PlannerApi>) -> Self {
        Self {
            conversation,
            api,
            seed: None,
        }
    }

    /// Plan to restore as the opening message whenever the chat is cleared
    pub fn with_seed(mut self, plan: impl Into<String>) -> Self {
        self.seed = Some(plan.into());
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run the chat loop until `/quit` or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = format!("{} ", ">".bright_green());
            // A draft left behind by a failed send is offered for editing
            let readline = if self.conversation.draft().is_empty() {
                rl.readline(&prompt)
            } else {
                let draft = self.conversation.draft().to_string();
                rl.readline_with_initial(&prompt, (draft.as_str(), ""))
            };

            match readline {
                Ok(line) => match LineAction::parse(&line) {
                    LineAction::Skip => continue,
                    LineAction::Command(SlashCommand::Quit) => break,
                    LineAction::Command(cmd) => {
                        let _ = rl.add_history_entry(line.trim());
                        self.handle_slash_command(cmd, &mut rl)?;
                    }
                    LineAction::Message(text) => {
                        let _ = rl.add_history_entry(text);
                        self.send(text, &mut rl).await?;
                    }
                },
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Experiment Planner Chat".bright_cyan().bold());
        let count = self.conversation.transcript().len();
        if count > 0 {
            println!("{} messages in this conversation", count);
        }
        if let Some(latest) = self.latest_message() {
            println!();
            print!("{}", latest);
            println!();
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// The most recent message, headed by its author and rendered
    ///
    /// `None` when it is the plan that was just shown.
    fn latest_message(&self) -> Option<String> {
        let msg = self.conversation.transcript().last()?;
        if self.seed.as_deref() == Some(msg.content()) {
            return None;
        }
        let role = match msg.role() {
            ChatRole::User => "You".bright_green().bold(),
            ChatRole::Assistant => "Planner".bright_blue().bold(),
        };
        Some(format!("{} {}\n{}", "Latest:".dimmed(), role, render::to_terminal(msg.content())))
    }

    /// Clear the conversation, restoring the plan this chat was opened with
    pub fn clear_conversation(&mut self) {
        self.conversation.clear();
        if let Some(plan) = &self.seed {
            self.conversation.seed(plan);
        }
    }

    fn handle_slash_command(&mut self, cmd: SlashCommand, rl: &mut DefaultEditor) -> Result<()> {
        debug!(?cmd, "ChatRepl::handle_slash_command: called");
        match cmd {
            SlashCommand::Help => self.print_help(),
            SlashCommand::Clear => {
                if confirm(rl, "Clear the whole conversation? [y/N] ")? {
                    self.clear_conversation();
                    if self.conversation.transcript().is_empty() {
                        println!("{}", "Conversation cleared.".dimmed());
                    } else {
                        println!("{}", "Conversation cleared; the plan was kept as the first message.".dimmed());
                    }
                } else {
                    println!("{}", "Kept the conversation.".dimmed());
                }
            }
            SlashCommand::History => print!("{}", format_transcript(self.conversation.transcript())),
            SlashCommand::Quit => {}
            SlashCommand::Unknown(name) => {
                println!("{} Unknown command: {}", "?".yellow(), name);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        Ok(())
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the chat", "/quit".yellow());
        println!("  {:14} Clear the conversation", "/clear".yellow());
        println!("  {:14} Show the conversation", "/history".yellow());
        println!();
    }

    async fn send(&mut self, input: &str, rl: &mut DefaultEditor) -> Result<()> {
        self.conversation.set_draft(input);
        println!("{}", "Thinking...".dimmed());

        match self.conversation.send(self.api.as_ref()).await {
            Ok(reply) => {
                println!();
                print!("{}", render::to_terminal(&reply));
                println!();
            }
            Err(SendError::Failed(reason)) => {
                info!(%reason, "ChatRepl::send: send failed");
                println!("{} {}", "Error:".red().bold(), reason);
                println!("{}", "Your message was not sent and has been kept for editing.".dimmed());
                // Blocking notice, acknowledged with Enter
                match rl.readline(&format!("{} ", "Press Enter to continue".yellow())) {
                    Ok(_) | Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {}
                    Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
                }
            }
            Err(other) => println!("{} {}", "!".yellow(), other),
        }
        Ok(())
    }
}

/// Ask a yes/no question; anything but `y`/`yes` is no
pub fn confirm(rl: &mut DefaultEditor, question: &str) -> Result<bool> {
    match rl.readline(question) {
        Ok(answer) => Ok(is_yes(&answer)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(false),
        Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockPlannerApi;
    use crate::domain::ChatMessage;
    use crate::store::MemoryStorage;

    fn repl_with(replies: Vec<Result<String, String>>) -> (ChatRepl, Arc<MockPlannerApi>) {
        let api = Arc::new(MockPlannerApi::new(replies));
        let conversation = Conversation::restore(Arc::new(MemoryStorage::new()));
        (ChatRepl::new(conversation, api.clone()), api)
    }

    #[test]
    fn test_parse_plain_text_is_message() {
        assert_eq!(SlashCommand::parse("Shorten this"), None);
    }

    #[test]
    fn test_parse_commands_and_aliases() {
        assert_eq!(SlashCommand::parse("/help"), Some(SlashCommand::Help));
        assert_eq!(SlashCommand::parse("/h"), Some(SlashCommand::Help));
        assert_eq!(SlashCommand::parse("/q"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("/exit"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("/clear now"), Some(SlashCommand::Clear));
        assert_eq!(SlashCommand::parse("/history"), Some(SlashCommand::History));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            SlashCommand::parse("/frobnicate x"),
            Some(SlashCommand::Unknown("/frobnicate".to_string()))
        );
    }

    #[test]
    fn test_line_action_keeps_message_verbatim() {
        assert_eq!(LineAction::parse("   "), LineAction::Skip);
        assert_eq!(LineAction::parse(" /quit "), LineAction::Command(SlashCommand::Quit));
        assert_eq!(
            LineAction::parse("  - keep this bullet indented"),
            LineAction::Message("  - keep this bullet indented")
        );
    }

    #[tokio::test]
    async fn test_clear_restores_seed_plan() {
        let (repl, api) = repl_with(vec![Ok("Short plan".to_string())]);
        let mut repl = repl.with_seed("# Plan");
        repl.conversation.seed("# Plan");
        repl.conversation.set_draft("Make it longer");
        repl.conversation.begin_send().unwrap();

        repl.clear_conversation();
        assert_eq!(repl.conversation().transcript().messages(), &[ChatMessage::assistant("# Plan")]);

        repl.conversation.set_draft("Shorten this");
        repl.conversation.send(api.as_ref()).await.unwrap();
        let requests = api.chat_requests.lock().unwrap();
        assert_eq!(requests[0].history, vec![ChatMessage::assistant("# Plan")]);
    }

    #[test]
    fn test_clear_without_seed_empties() {
        let (mut repl, _api) = repl_with(vec![]);
        repl.conversation.seed("# Plan");

        repl.clear_conversation();
        assert!(repl.conversation().transcript().is_empty());
    }

    #[test]
    fn test_latest_message_shows_last_entry() {
        let (mut repl, _api) = repl_with(vec![]);
        assert_eq!(repl.latest_message(), None);

        repl.conversation.seed("# Plan");
        let latest = repl.latest_message().unwrap();
        assert!(latest.contains("Planner"));
        assert!(latest.contains("Plan"));
    }

    #[test]
    fn test_latest_message_skips_fresh_plan() {
        let (repl, _api) = repl_with(vec![]);
        let mut repl = repl.with_seed("# Plan");
        repl.conversation.seed("# Plan");
        assert_eq!(repl.latest_message(), None);

        repl.conversation.set_draft("Shorten this");
        repl.conversation.begin_send().unwrap();
        assert!(repl.latest_message().unwrap().contains("Shorten this"));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
