use thiserror::Error;

/// Prefix every rendered not-found error starts with. The system instruction
/// tells the model to recover from results that contain it.
pub const FILE_NOT_FOUND_MARKER: &str = "Error: File not found";

/// Errors returned by repository operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("File not found at '{path}' on branch '{branch}'.")]
    FileNotFound { path: String, branch: String },

    #[error("Directory not found: '{path}'.")]
    DirectoryNotFound { path: String },

    #[error("'{path}' is a directory, not a file.")]
    IsDirectory { path: String },

    #[error("'{path}' is a {kind}, not a regular file.")]
    NotAFile { path: String, kind: String },

    #[error("Line containing '{identifier}' not found in '{path}'.")]
    LineNotFound { identifier: String, path: String },

    #[error("Write conflict on '{path}': {reason}")]
    Conflict { path: String, reason: String },

    #[error("Repository credentials rejected: {0}")]
    Unauthorized(String),

    #[error("Repository access forbidden: {0}")]
    Forbidden(String),

    #[error("Repository API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Repository transport error: {0}")]
    Transport(String),

    #[error("Could not decode repository response: {0}")]
    Decode(String),

    #[error("Repository not configured: {0}")]
    Config(String),
}

impl RepoError {
    /// Render as the text a tool hands back to the model.
    pub fn to_tool_text(&self) -> String {
        format!("Error: {self}")
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepoError::FileNotFound { .. } | RepoError::DirectoryNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RepoError::Decode(e.to_string())
        } else {
            RepoError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_text_starts_with_marker() {
        let err = RepoError::FileNotFound {
            path: "notes.md".into(),
            branch: "main".into(),
        };
        let text = err.to_tool_text();
        assert!(text.starts_with(FILE_NOT_FOUND_MARKER));
        assert_eq!(text, "Error: File not found at 'notes.md' on branch 'main'.");
    }

    #[test]
    fn line_not_found_text() {
        let err = RepoError::LineNotFound {
            identifier: "pH:".into(),
            path: "docs/a.md".into(),
        };
        assert_eq!(
            err.to_tool_text(),
            "Error: Line containing 'pH:' not found in 'docs/a.md'."
        );
        assert!(!err.is_not_found());
    }
}
