//! # gitscribe Core
//!
//! Domain types, traits, and error definitions for the gitscribe repository
//! agent. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`]: the language model (`gitscribe-providers`)
//! - [`Tool`]: a named repository operation (`gitscribe-tools`)
//!
//! The conversation itself is a [`History`], an append-only log whose only
//! mutation point is [`History::apply`].

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{HistoryError, ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{History, HistoryUpdate, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry, ToolResult};
