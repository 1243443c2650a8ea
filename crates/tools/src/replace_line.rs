//! Replace line tool: swap one identified line in an existing file.

use async_trait::async_trait;
use gitscribe_core::error::ToolError;
use gitscribe_core::tool::{Tool, ToolOutput};
use gitscribe_repository::RepositoryClient;
use serde::Deserialize;

pub struct ReplaceLineTool {
    client: RepositoryClient,
}

impl ReplaceLineTool {
    pub fn new(client: RepositoryClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    file_path: String,
    line_identifier: String,
    new_line: String,
    commit_message: String,
}

#[async_trait]
impl Tool for ReplaceLineTool {
    fn name(&self) -> &str {
        crate::names::REPLACE_LINE
    }

    fn description(&self) -> &str {
        "Replaces a SINGLE line in an existing file. The first line containing \
         'line_identifier' becomes 'new_line' (the complete new line)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Full path from the repository root"
                },
                "line_identifier": {
                    "type": "string",
                    "description": "Text that appears on the target line"
                },
                "new_line": {
                    "type": "string",
                    "description": "The full replacement line"
                },
                "commit_message": {
                    "type": "string",
                    "description": "Commit message describing the change"
                }
            },
            "required": ["file_path", "line_identifier", "new_line", "commit_message"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: Args = crate::parse_args(self.name(), arguments)?;
        crate::require(self.name(), "file_path", &args.file_path)?;
        // An empty identifier would match the first line of any file
        crate::require(self.name(), "line_identifier", &args.line_identifier)?;

        let text = match self
            .client
            .replace_line(
                &args.file_path,
                &args.line_identifier,
                &args.new_line,
                &args.commit_message,
            )
            .await
        {
            Ok(receipt) => receipt.to_string(),
            Err(e) => e.to_tool_text(),
        };
        Ok(ToolOutput::Text(text))
    }
}
