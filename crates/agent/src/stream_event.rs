//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is what the gateway forwards to clients over SSE.
//! A stream carries any number of `status`/`log` progress events and then
//! exactly one terminal event:
//! - `complete`: the run ended, with the aggregated answer and its outcome
//! - `error`: an unrecovered fault, or a request that could not start

use serde::{Deserialize, Serialize};

/// Events emitted by the agent during streaming execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Human-readable progress line.
    Status { message: String },

    /// Terse log line for the same transition.
    Log { data: String },

    /// The run finished; always the last event of a successful stream.
    Complete {
        final_response: String,
        outcome: String,
        steps: usize,
    },

    /// The run could not produce an answer.
    Error { message: String },
}

impl AgentStreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn log(data: impl Into<String>) -> Self {
        Self::Log { data: data.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Log { .. } => "log",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// First `max_chars` characters of `text`, with `...` appended if cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Call ids are shown by their first six characters.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(6) {
        Some((cut, _)) => &id[..cut],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_status() {
        let json = serde_json::to_string(&AgentStreamEvent::status("Agent: Thinking...")).unwrap();
        assert_eq!(json, r#"{"type":"status","message":"Agent: Thinking..."}"#);
    }

    #[test]
    fn event_serialization_complete() {
        let event = AgentStreamEvent::Complete {
            final_response: "done".into(),
            outcome: "done".into(),
            steps: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"complete""#));
        assert!(json.contains(r#""final_response":"done""#));
        assert!(json.contains(r#""steps":3"#));
    }

    #[test]
    fn event_deserialization() {
        let event: AgentStreamEvent =
            serde_json::from_str(r#"{"type":"log","data":"Step executed."}"#).unwrap();
        assert_eq!(event, AgentStreamEvent::log("Step executed."));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(AgentStreamEvent::status("x").event_type(), "status");
        assert_eq!(AgentStreamEvent::log("x").event_type(), "log");
        assert_eq!(AgentStreamEvent::error("x").event_type(), "error");
        assert!(AgentStreamEvent::error("x").is_terminal());
        assert!(!AgentStreamEvent::log("x").is_terminal());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview(&"a".repeat(101), 100), format!("{}...", "a".repeat(100)));
        assert_eq!(preview("héllo wörld", 4), "héll...");
    }

    #[test]
    fn short_id_takes_six_chars() {
        assert_eq!(short_id("call_abcdef"), "call_a");
        assert_eq!(short_id("abc"), "abc");
    }
}
