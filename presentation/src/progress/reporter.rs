//! Progress reporting for orchestrator runs
//!
//! Both reporters write to stderr so stdout carries only the answer.

use colored::Colorize;
use conductor_application::OrchestratorProgress;
use conductor_domain::core::string::{single_line, truncate};
use conductor_domain::{TerminationReason, ToolCall, ToolResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Spinner-based reporter; tool activity is printed above the spinner
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.spinner.lock()
            && let Some(pb) = guard.as_ref()
        {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorProgress for ProgressReporter {
    fn on_round_start(&self, round: usize, max_depth: usize) {
        let Ok(mut guard) = self.spinner.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        pb.set_prefix(format!("Round {}/{}", round, max_depth));
        pb.set_message("Waiting for model...");
    }

    fn on_model_response(&self, tool_calls: usize) {
        if tool_calls > 0 {
            self.with_spinner(|pb| pb.set_message(format!("Running {} tool call(s)...", tool_calls)));
        }
    }

    fn on_tool_dispatch(&self, call: &ToolCall) {
        self.with_spinner(|pb| pb.println(format_dispatch(call)));
    }

    fn on_tool_result(&self, call: &ToolCall, result: &ToolResult) {
        self.with_spinner(|pb| pb.println(format_result(call, result)));
    }

    fn on_terminated(&self, _reason: &TerminationReason) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_and_clear();
        }
    }
}

/// Simple line-based progress (no fancy UI)
pub struct SimpleProgress;

impl OrchestratorProgress for SimpleProgress {
    fn on_round_start(&self, round: usize, max_depth: usize) {
        eprintln!("{} {}", "->".cyan(), format!("Round {}/{}", round, max_depth).bold());
    }

    fn on_tool_dispatch(&self, call: &ToolCall) {
        eprintln!("{}", format_dispatch(call));
    }

    fn on_tool_result(&self, call: &ToolCall, result: &ToolResult) {
        eprintln!("{}", format_result(call, result));
    }

    fn on_terminated(&self, reason: &TerminationReason) {
        if !reason.is_completed() {
            eprintln!("{} {:?}", "!".yellow(), reason);
        }
    }
}

fn format_dispatch(call: &ToolCall) -> String {
    let args = truncate(&single_line(&call.arguments_json().to_string()), 80);
    format!("  {} {} {}", "*".cyan(), call.tool_name.bold(), args.dimmed())
}

fn format_result(call: &ToolCall, result: &ToolResult) -> String {
    let elapsed = result
        .duration_ms
        .map(|ms| format!(" ({}ms)", ms))
        .unwrap_or_default();

    match result.error() {
        None => format!("  {} {}{}", "v".green(), call.tool_name, elapsed.dimmed()),
        Some(error) => format!(
            "  {} {}{}: {}",
            "x".red(),
            call.tool_name,
            elapsed.dimmed(),
            truncate(&single_line(&error.to_string()), 120).red()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::ToolError;

    #[test]
    fn test_format_result_success_and_failure() {
        colored::control::set_override(false);
        let call = ToolCall::new("call_1", "document_search");

        let ok = ToolResult::success("call_1", "document_search", "found").with_duration(12);
        assert_eq!(format_result(&call, &ok), "  v document_search (12ms)");

        let failed = ToolResult::failure(
            "call_1",
            "document_search",
            ToolError::invalid_argument("Missing required argument: request"),
        );
        let line = format_result(&call, &failed);
        assert!(line.starts_with("  x document_search: "));
        assert!(line.contains("Missing required argument: request"));
    }

    #[test]
    fn test_reporter_without_round_is_silent() {
        let reporter = ProgressReporter::new();
        let call = ToolCall::new("c", "t");
        reporter.on_tool_dispatch(&call);
        reporter.on_terminated(&TerminationReason::Completed);
        assert!(reporter.spinner.lock().unwrap().is_none());
    }
}
