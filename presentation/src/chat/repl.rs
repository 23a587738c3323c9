//! REPL (Read-Eval-Print Loop) for interactive chat
//!
//! One conversation spans the whole session. `/clear` starts over with the
//! same id; leaving the loop closes the conversation's retrieval index.

use super::compose_user_message;
use crate::ConsoleFormatter;
use colored::Colorize;
use conductor_application::Orchestrator;
use conductor_domain::{Conversation, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Interactive chat REPL
pub struct ChatRepl {
    orchestrator: Orchestrator,
    conversation: Conversation,
    formatter: ConsoleFormatter,
    /// Attached to the next user message, then cleared
    pending_files: Vec<String>,
    files: Vec<String>,
}

enum Command {
    Exit,
    Clear,
    Help,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        match line {
            "/exit" | "/quit" => Command::Exit,
            "/clear" => Command::Clear,
            "/help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

impl ChatRepl {
    pub fn new(orchestrator: Orchestrator, conversation: Conversation, formatter: ConsoleFormatter) -> Self {
        Self {
            orchestrator,
            conversation,
            formatter,
            pending_files: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Attach file references to the first message (and again after `/clear`)
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.pending_files = files.clone();
        self.files = files;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run the REPL on stdin/stdout
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.print_welcome();
        self.run_with(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Run the REPL over arbitrary input and output streams
    pub async fn run_with<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            output.write_all(b">>> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\nBye!\n").await?;
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                match Command::parse(line) {
                    Command::Exit => {
                        output.write_all(b"Bye!\n").await?;
                        break;
                    }
                    Command::Clear => {
                        self.conversation.clear();
                        self.orchestrator.close_conversation(self.conversation.id());
                        self.pending_files = self.files.clone();
                        output.write_all(b"Conversation cleared.\n").await?;
                    }
                    Command::Help => output.write_all(Self::help_text().as_bytes()).await?,
                    Command::Unknown(cmd) => {
                        let text = format!("Unknown command: {} (try /help)\n", cmd);
                        output.write_all(text.as_bytes()).await?;
                    }
                }
                continue;
            }

            if !self.process_question(line, &mut output).await? {
                break;
            }
        }

        self.orchestrator.close_conversation(self.conversation.id());
        output.flush().await
    }

    /// Returns `false` when the session should end.
    async fn process_question<W>(&mut self, question: &str, output: &mut W) -> std::io::Result<bool>
    where
        W: AsyncWrite + Unpin,
    {
        let files = std::mem::take(&mut self.pending_files);
        let message = Message::user(compose_user_message(question, &files));

        if let Err(e) = self.conversation.push(message) {
            let text = format!("{}\n", self.formatter.format_error(&e.to_string()));
            output.write_all(text.as_bytes()).await?;
            return Ok(true);
        }

        match self.orchestrator.run(&mut self.conversation).await {
            Ok(outcome) => {
                let text = format!("\n{}\n", self.formatter.format(&outcome));
                output.write_all(text.as_bytes()).await?;
                Ok(true)
            }
            Err(e) if e.is_cancelled() => {
                output.write_all(b"Cancelled.\n").await?;
                Ok(false)
            }
            Err(e) => {
                let text = format!("{}\n", self.formatter.format_error(&e.to_string()));
                output.write_all(text.as_bytes()).await?;
                Ok(true)
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Conductor - Chat Mode".cyan().bold());
        println!("Conversation: {}", self.conversation.id());
        if !self.files.is_empty() {
            println!("Attached: {}", self.files.join(", "));
        }
        println!("Type /help for commands.");
        println!();
    }

    fn help_text() -> String {
        "Commands:\n  /clear  Start the conversation over\n  /exit   Leave (also /quit)\n  /help   Show this help\n"
            .to_string()
    }
}
