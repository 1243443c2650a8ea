//! List files tool: every file path under a directory, recursively.

use async_trait::async_trait;
use gitscribe_core::error::ToolError;
use gitscribe_core::tool::{Tool, ToolOutput};
use gitscribe_repository::RepositoryClient;
use serde::Deserialize;

pub struct ListFilesTool {
    client: RepositoryClient,
}

impl ListFilesTool {
    pub fn new(client: RepositoryClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default)]
    directory_path: Option<String>,
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        crate::names::LIST_FILES
    }

    fn description(&self) -> &str {
        "Lists every file path under a directory, recursively (repository root if empty). \
         Use it to find the full path of a file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory_path": {
                    "type": "string",
                    "description": "Directory to list, relative to the repository root. Empty for the root."
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: Args = if arguments.is_null() {
            Args { directory_path: None }
        } else {
            crate::parse_args(self.name(), arguments)?
        };
        let directory = args.directory_path.unwrap_or_default();

        let listing = match self.client.list(&directory).await {
            Ok(files) if files.is_empty() => {
                vec![format!("No files found in '{directory}'.")]
            }
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(directory = %directory, error = %e, "list_files failed");
                vec![e.to_tool_text()]
            }
        };
        Ok(ToolOutput::Json(serde_json::json!(listing)))
    }
}
