//! Extracting the user-facing answer from a finished history.

use gitscribe_core::message::History;

/// The latest model message without tool requests, or a description of the
/// last message when there is none (the run was cut off mid-turn).
pub fn final_answer(history: &History) -> String {
    if let Some(message) = history.final_answer() {
        return message.content.clone();
    }
    match history.last() {
        Some(last) => format!(
            "Agent finished. Last step result ({}): {}",
            last.role, last.content
        ),
        None => "Agent finished, but no final response found.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitscribe_core::message::{HistoryUpdate, Message, MessageToolCall};

    fn call(id: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: "list_files".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn picks_latest_final_model_message() {
        let mut history = History::new("hi");
        history
            .apply(HistoryUpdate::Model(Message::assistant_with_tools("", vec![call("c1")])))
            .unwrap();
        history
            .apply(HistoryUpdate::ToolResults(vec![Message::tool_result("c1", "[]")]))
            .unwrap();
        history
            .apply(HistoryUpdate::Model(Message::assistant("All done.")))
            .unwrap();

        assert_eq!(final_answer(&history), "All done.");
    }

    #[test]
    fn degrades_to_last_message() {
        let mut history = History::new("hi");
        history
            .apply(HistoryUpdate::Model(Message::assistant_with_tools("", vec![call("c1")])))
            .unwrap();
        history
            .apply(HistoryUpdate::ToolResults(vec![Message::tool_result("c1", "[\"a.md\"]")]))
            .unwrap();

        assert_eq!(
            final_answer(&history),
            "Agent finished. Last step result (tool): [\"a.md\"]"
        );
    }

    #[test]
    fn user_only_history_degrades_too() {
        let history = History::new("hello");
        assert_eq!(
            final_answer(&history),
            "Agent finished. Last step result (user): hello"
        );
    }
}
