//! Message and history domain types.
//!
//! These are the value objects that flow through one agent run:
//! the user prompt seeds a [`History`], the model appends its turns, tool
//! results are appended after each batch of tool requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::HistoryError;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The language model
    Assistant,
    /// System instruction (never stored in history)
    System,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the model (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional metadata (provider info, synthesized-error marker, etc.)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant message that requests tools.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::assistant(content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Whether this is a model message that asks for tool execution.
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }

    /// Whether this is a model message that ends the run.
    pub fn is_final_answer(&self) -> bool {
        self.role == Role::Assistant && self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// One state update to a [`History`].
#[derive(Debug, Clone)]
pub enum HistoryUpdate {
    /// One model turn: a final answer or a batch of tool requests.
    Model(Message),
    /// The results for the preceding model turn's tool requests, in request order.
    ToolResults(Vec<Message>),
}

/// The append-only message log of one agent run.
///
/// [`History::apply`] is the only way to add messages. It checks that
/// tool results answer the tool requests of the immediately preceding model
/// message, each call id at most once.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    /// Identifier of the run this history belongs to (for logs)
    pub id: String,

    messages: Vec<Message>,

    /// When this run started
    pub created_at: DateTime<Utc>,
}

impl History {
    /// Start a history seeded with one user message.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: vec![Message::user(prompt)],
            created_at: Utc::now(),
        }
    }

    /// All messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Tool requests of the last message, if it is a model message that wants tools.
    pub fn pending_tool_calls(&self) -> &[MessageToolCall] {
        match self.messages.last() {
            Some(last) if last.requests_tools() => &last.tool_calls,
            _ => &[],
        }
    }

    /// The most recent model message without tool requests.
    pub fn final_answer(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_final_answer())
    }

    /// Apply one update. This is the single mutation point of a history.
    pub fn apply(&mut self, update: HistoryUpdate) -> Result<(), HistoryError> {
        match update {
            HistoryUpdate::Model(message) => {
                expect_role(&message, Role::Assistant, "assistant")?;
                if !self.pending_tool_calls().is_empty() {
                    return Err(HistoryError::UnexpectedRole {
                        expected: "tool",
                        actual: message.role.to_string(),
                    });
                }
                self.messages.push(message);
            }
            HistoryUpdate::ToolResults(results) => {
                let pending: HashSet<&str> = self
                    .pending_tool_calls()
                    .iter()
                    .map(|tc| tc.id.as_str())
                    .collect();
                if pending.is_empty() {
                    return Err(HistoryError::NoPendingToolCalls);
                }

                let mut answered = HashSet::new();
                for result in &results {
                    expect_role(result, Role::Tool, "tool")?;
                    let call_id = result.tool_call_id.clone().unwrap_or_default();
                    if !pending.contains(call_id.as_str()) {
                        return Err(HistoryError::UnknownCallId(call_id));
                    }
                    if !answered.insert(call_id.clone()) {
                        return Err(HistoryError::DuplicateCallId(call_id));
                    }
                }

                self.messages.extend(results);
            }
        }
        Ok(())
    }
}

fn expect_role(message: &Message, role: Role, expected: &'static str) -> Result<(), HistoryError> {
    if message.role == role {
        Ok(())
    } else {
        Err(HistoryError::UnexpectedRole {
            expected,
            actual: message.role.to_string(),
        })
    }
}
