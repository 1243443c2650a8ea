//! Model provider implementations for gitscribe.
//!
//! All providers implement the `gitscribe_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod gemini;
pub mod router;

pub use gemini::GeminiProvider;
pub use router::{ProviderRouter, SUPPORTED_PROVIDERS, build_from_config};
