//! Prompt domain
//!
//! Fixed texts the orchestrator puts in front of the model or the user.

/// Default system prompt for a tool-using assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a capable general-purpose assistant with access to tools.

Use a tool when it gives a more precise or more current answer than you could \
produce on your own: run code for calculations, search documents for facts \
they contain, generate images when asked to draw. Call independent tools in \
the same turn. When a tool fails, read its error and either retry with \
corrected arguments, pick another tool, or explain the failure.

Answer from tool results when you used them. Be concise.";

/// Final message when the round limit stops a run.
pub fn depth_exceeded_message(max_depth: usize) -> String {
    format!(
        "I stopped after {} rounds of tool use without reaching a final answer. \
         The request may need to be split into smaller steps.",
        max_depth
    )
}

/// Final message when a remote tool server became unusable mid-run.
pub fn server_unavailable_message(tool_name: &str, message: &str) -> String {
    format!(
        "I could not finish because the tool '{}' is no longer reachable ({}). \
         Please try again later.",
        tool_name, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_exceeded_message_names_limit() {
        assert!(depth_exceeded_message(7).contains("7 rounds"));
    }

    #[test]
    fn test_server_unavailable_message_names_tool() {
        let msg = server_unavailable_message("execute_code", "connection refused");
        assert!(msg.contains("execute_code"));
        assert!(msg.contains("connection refused"));
    }
}
