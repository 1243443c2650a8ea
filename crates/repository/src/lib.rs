//! # gitscribe Repository
//!
//! Typed file operations on one branch of a remote repository:
//! list, read, write (create or update) and single-line replacement.
//!
//! Every operation returns `Result<_, RepoError>`. Turning errors into the
//! text the model sees happens at the tool boundary via
//! [`RepoError::to_tool_text`].
//!
//! Backends:
//! - [`GitHubBackend`]: GitHub REST Contents API
//! - [`MemoryBackend`]: in-process map, for tests and dry runs

pub mod backend;
pub mod client;
pub mod error;
pub mod github;
pub mod memory;

pub use backend::{ConnectionInfo, Contents, Entry, EntryKind, RepositoryBackend};
pub use client::{RepositoryClient, WriteAction, WriteReceipt};
pub use error::{FILE_NOT_FOUND_MARKER, RepoError};
pub use github::GitHubBackend;
pub use memory::{CommitRecord, MemoryBackend};
