//! Write file tool: create or overwrite a file with one commit.

use async_trait::async_trait;
use gitscribe_core::error::ToolError;
use gitscribe_core::tool::{Tool, ToolOutput};
use gitscribe_repository::RepositoryClient;
use serde::Deserialize;

pub struct WriteFileTool {
    client: RepositoryClient,
}

impl WriteFileTool {
    pub fn new(client: RepositoryClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    file_path: String,
    content: String,
    commit_message: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        crate::names::WRITE_FILE
    }

    fn description(&self) -> &str {
        "Creates or overwrites a file at its full path with the given content and commit message."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Full path from the repository root"
                },
                "content": {
                    "type": "string",
                    "description": "The complete new file content"
                },
                "commit_message": {
                    "type": "string",
                    "description": "Commit message describing the change"
                }
            },
            "required": ["file_path", "content", "commit_message"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: Args = crate::parse_args(self.name(), arguments)?;
        crate::require(self.name(), "file_path", &args.file_path)?;

        let text = match self
            .client
            .write(&args.file_path, &args.content, &args.commit_message)
            .await
        {
            Ok(receipt) => receipt.to_string(),
            Err(e) => e.to_tool_text(),
        };
        Ok(ToolOutput::Text(text))
    }
}
