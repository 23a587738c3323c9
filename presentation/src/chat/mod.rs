//! Interactive chat mode

mod repl;

pub use repl::ChatRepl;

/// Append attached file references to a user message so the model can pass
/// them to file tools.
pub fn compose_user_message(question: &str, files: &[String]) -> String {
    if files.is_empty() {
        return question.to_string();
    }

    let mut message = question.trim_end().to_string();
    message.push_str("\n\nAttached files:");
    for file in files {
        message.push_str("\n- ");
        message.push_str(file);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_files_leaves_question_alone() {
        assert_eq!(compose_user_message("hello ", &[]), "hello ");
    }

    #[test]
    fn test_files_are_listed() {
        let files = vec!["report.txt".to_string(), "https://example.com/a.html".to_string()];
        assert_eq!(
            compose_user_message("Summarize these\n", &files),
            "Summarize these\n\nAttached files:\n- report.txt\n- https://example.com/a.html"
        );
    }
}
