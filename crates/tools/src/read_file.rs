//! Read file tool.

use async_trait::async_trait;
use gitscribe_core::error::ToolError;
use gitscribe_core::tool::{Tool, ToolOutput};
use gitscribe_repository::RepositoryClient;
use serde::Deserialize;

pub struct ReadFileTool {
    client: RepositoryClient,
}

impl ReadFileTool {
    pub fn new(client: RepositoryClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    file_path: String,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        crate::names::READ_FILE
    }

    fn description(&self) -> &str {
        "Reads the content of a file by its full path from the repository root. \
         Returns 'Error: File not found...' if the path is wrong."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Full path from the repository root, e.g. 'docs/ingredients/argan_oil.md'"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: Args = crate::parse_args(self.name(), arguments)?;
        crate::require(self.name(), "file_path", &args.file_path)?;

        let text = match self.client.read(&args.file_path).await {
            Ok(text) => text,
            Err(e) => e.to_tool_text(),
        };
        Ok(ToolOutput::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seeded;
    use gitscribe_repository::FILE_NOT_FOUND_MARKER;

    #[tokio::test]
    async fn reads_exact_content() {
        let (client, _) = seeded();
        let output = ReadFileTool::new(client)
            .execute(serde_json::json!({"file_path": "docs/notes.md"}))
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::Text("Notes\nstatus: draft\n".into()));
    }

    #[tokio::test]
    async fn missing_file_carries_marker() {
        let (client, _) = seeded();
        let output = ReadFileTool::new(client)
            .execute(serde_json::json!({"file_path": "notes.md"}))
            .await
            .unwrap()
            .render();
        assert!(output.starts_with(FILE_NOT_FOUND_MARKER));
        assert!(output.contains("'notes.md'"));
        assert!(output.contains("'main'"));
    }

    #[tokio::test]
    async fn missing_argument_is_tool_fault() {
        let (client, _) = seeded();
        let tool = ReadFileTool::new(client);
        assert!(matches!(
            tool.execute(serde_json::json!({})).await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            tool.execute(serde_json::json!({"file_path": "  "})).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }
}
