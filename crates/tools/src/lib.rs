//! Repository tools for gitscribe.
//!
//! Four tools give the agent access to one repository branch:
//! `list_files`, `read_file`, `write_file` and `replace_line`. Repository
//! failures are returned as `Error: ...` text so the model can react to
//! them; only malformed arguments are tool faults.

pub mod list_files;
pub mod read_file;
pub mod replace_line;
pub mod write_file;

use gitscribe_core::error::ToolError;
use gitscribe_core::tool::ToolRegistry;
use gitscribe_repository::RepositoryClient;
use serde::de::DeserializeOwned;

pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use replace_line::ReplaceLineTool;
pub use write_file::WriteFileTool;

/// Tool names as declared to the model.
pub mod names {
    pub const LIST_FILES: &str = "list_files";
    pub const READ_FILE: &str = "read_file";
    pub const WRITE_FILE: &str = "write_file";
    pub const REPLACE_LINE: &str = "replace_line";
}

/// Build the tool catalog over a connected repository, in declaration order.
pub fn repository_registry(client: RepositoryClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListFilesTool::new(client.clone())));
    registry.register(Box::new(ReadFileTool::new(client.clone())));
    registry.register(Box::new(WriteFileTool::new(client.clone())));
    registry.register(Box::new(ReplaceLineTool::new(client)));
    registry
}

/// Deserialize tool arguments into their typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool_name: &str,
    arguments: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{tool_name}: {e}")))
}

/// Reject blank required string arguments.
pub(crate) fn require(tool_name: &str, field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        Err(ToolError::InvalidArguments(format!(
            "{tool_name}: '{field}' must not be empty"
        )))
    } else {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_declares_four_tools_in_order() {
        let (client, _) = test_support::seeded();
        let registry = repository_registry(client);
        assert_eq!(
            registry.names(),
            vec!["list_files", "read_file", "write_file", "replace_line"]
        );
        for def in registry.definitions() {
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
        }
    }
}
