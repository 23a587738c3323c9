//! Console output formatter for run outcomes

use colored::Colorize;
use conductor_application::RunOutcome;
use conductor_domain::{OutputFormat, TerminationReason};
use serde_json::json;

/// Formats run outcomes for console display
pub struct ConsoleFormatter {
    format: OutputFormat,
}

impl ConsoleFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, outcome: &RunOutcome) -> String {
        match self.format {
            OutputFormat::Text => Self::format_text(outcome),
            OutputFormat::Json => Self::format_json(outcome),
        }
    }

    /// The answer, followed by a notice when the run stopped early
    pub fn format_text(outcome: &RunOutcome) -> String {
        let mut output = outcome.final_message.trim_end().to_string();
        output.push('\n');

        if let Some(notice) = Self::termination_notice(&outcome.termination) {
            output.push_str(&format!("\n{}\n", notice.yellow()));
        }

        output
    }

    /// Format as JSON
    pub fn format_json(outcome: &RunOutcome) -> String {
        let value = json!({
            "answer": outcome.final_message,
            "termination": outcome.termination,
            "rounds": outcome.rounds,
            "tool_calls": outcome.tool_calls,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Text => format!("{} {}", "Error:".red().bold(), message),
            OutputFormat::Json => json!({ "error": message }).to_string(),
        }
    }

    fn termination_notice(reason: &TerminationReason) -> Option<String> {
        match reason {
            TerminationReason::Completed => None,
            TerminationReason::DepthExceeded { max_depth } => {
                Some(format!("[stopped after {} rounds]", max_depth))
            }
            TerminationReason::ServerUnavailable { tool_name, .. } => {
                Some(format!("[stopped: tool '{}' is unavailable]", tool_name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(termination: TerminationReason) -> RunOutcome {
        RunOutcome {
            final_message: "The report covers Q3.\n".to_string(),
            termination,
            rounds: 2,
            tool_calls: 1,
        }
    }

    #[test]
    fn test_completed_text_is_just_the_answer() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_text(&outcome(TerminationReason::Completed));
        assert_eq!(text, "The report covers Q3.\n");
    }

    #[test]
    fn test_depth_exceeded_adds_notice() {
        colored::control::set_override(false);
        let text =
            ConsoleFormatter::format_text(&outcome(TerminationReason::DepthExceeded { max_depth: 2 }));
        assert!(text.ends_with("[stopped after 2 rounds]\n"));
    }

    #[test]
    fn test_json_output() {
        let formatter = ConsoleFormatter::new(OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&formatter.format(&outcome(TerminationReason::Completed))).unwrap();

        assert_eq!(value["answer"], "The report covers Q3.\n");
        assert_eq!(value["termination"]["reason"], "completed");
        assert_eq!(value["rounds"], 2);
        assert_eq!(value["tool_calls"], 1);
    }

    #[test]
    fn test_json_error() {
        let formatter = ConsoleFormatter::new(OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_error("model unreachable")).unwrap();
        assert_eq!(value["error"], "model unreachable");
    }
}
