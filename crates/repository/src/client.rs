use gitscribe_config::RepositoryConfig;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{ConnectionInfo, Contents, Entry, EntryKind, RepositoryBackend};
use crate::error::RepoError;
use crate::github::GitHubBackend;

/// Whether a write created a new file or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Create,
    Update,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
        }
    }
}

impl std::fmt::Display for WriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub action: WriteAction,
    pub path: String,
    pub commit_sha: String,
}

impl std::fmt::Display for WriteReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Success ({}) '{}'. Commit: {}",
            self.action, self.path, self.commit_sha
        )
    }
}

/// File operations on one repository branch.
///
/// Cheap to clone; every clone shares the same backend.
#[derive(Clone)]
pub struct RepositoryClient {
    backend: Arc<dyn RepositoryBackend>,
}

fn normalize(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

impl RepositoryClient {
    pub fn new(backend: Arc<dyn RepositoryBackend>) -> Self {
        Self { backend }
    }

    /// Build the GitHub backend from config and check that it is usable.
    pub async fn connect(config: &RepositoryConfig) -> Result<(Self, ConnectionInfo), RepoError> {
        let backend = GitHubBackend::new(config)?;
        let info = backend.verify().await?;
        info!(
            login = %info.login,
            repository = %info.repository,
            branch = %info.branch,
            "Connected to repository"
        );
        Ok((Self::new(Arc::new(backend)), info))
    }

    pub fn repository(&self) -> &str {
        self.backend.repository()
    }

    pub fn branch(&self) -> &str {
        self.backend.branch()
    }

    /// All file paths under `directory`, depth-first.
    ///
    /// Subdirectories that cannot be listed are skipped. Listing a file
    /// returns just that file.
    pub async fn list(&self, directory: &str) -> Result<Vec<String>, RepoError> {
        let directory = normalize(directory);
        let top = match self.backend.contents(&directory).await {
            Ok(contents) => contents,
            Err(RepoError::FileNotFound { .. }) => {
                return Err(RepoError::DirectoryNotFound { path: directory });
            }
            Err(e) => return Err(e),
        };

        let entries = match top {
            Contents::Directory(entries) => entries,
            Contents::File { path, .. } | Contents::Other { path, .. } => return Ok(vec![path]),
        };

        let mut files = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<Entry> = entries.into_iter().rev().collect();

        while let Some(entry) = stack.pop() {
            if entry.kind != EntryKind::Dir {
                if seen.insert(entry.path.clone()) {
                    files.push(entry.path);
                }
                continue;
            }
            match self.backend.contents(&entry.path).await {
                Ok(Contents::Directory(children)) => stack.extend(children.into_iter().rev()),
                Ok(_) => warn!(path = %entry.path, "Listed directory came back as a file; skipping"),
                Err(e) => warn!(path = %entry.path, error = %e, "Skipping directory that could not be listed"),
            }
        }

        debug!(directory = %directory, count = files.len(), "Listed files");
        Ok(files)
    }

    /// Full text of a file.
    pub async fn read(&self, path: &str) -> Result<String, RepoError> {
        let path = normalize(path);
        match self.backend.contents(&path).await? {
            Contents::File { text, .. } => Ok(text),
            Contents::Directory(_) => Err(RepoError::IsDirectory { path }),
            Contents::Other { kind, .. } => Err(RepoError::NotAFile {
                path,
                kind: kind.as_str().to_string(),
            }),
        }
    }

    /// Create or replace a file. The commit message gets ` (create)` or
    /// ` (update)` appended; a blank message becomes just the tag.
    pub async fn write(
        &self,
        path: &str,
        text: &str,
        message: &str,
    ) -> Result<WriteReceipt, RepoError> {
        let path = normalize(path);
        let existing_sha = match self.backend.contents(&path).await {
            Ok(Contents::File { sha, .. }) => Some(sha),
            Ok(Contents::Directory(_)) => {
                return Err(RepoError::NotAFile {
                    path,
                    kind: EntryKind::Dir.as_str().to_string(),
                });
            }
            Ok(Contents::Other { kind, .. }) => {
                return Err(RepoError::NotAFile {
                    path,
                    kind: kind.as_str().to_string(),
                });
            }
            Err(RepoError::FileNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let action = if existing_sha.is_some() {
            WriteAction::Update
        } else {
            WriteAction::Create
        };
        let message = match message.trim() {
            "" => format!("({action})"),
            summary => format!("{summary} ({action})"),
        };
        let commit_sha = self
            .backend
            .put_file(&path, text, &message, existing_sha.as_deref())
            .await?;

        info!(path = %path, action = %action, commit = %commit_sha, "Committed file");
        Ok(WriteReceipt {
            action,
            path,
            commit_sha,
        })
    }

    /// Replace the first line containing `identifier` with `new_line`.
    pub async fn replace_line(
        &self,
        path: &str,
        identifier: &str,
        new_line: &str,
        message: &str,
    ) -> Result<WriteReceipt, RepoError> {
        let path = normalize(path);
        let text = self.read(&path).await?;
        let updated = replace_first_line(&text, identifier, new_line).ok_or_else(|| {
            RepoError::LineNotFound {
                identifier: identifier.to_string(),
                path: path.clone(),
            }
        })?;
        self.write(&path, &updated, message).await
    }
}

/// Swap the first line containing `identifier`, keeping a trailing newline.
///
/// Line endings are preserved: a replaced CRLF line keeps its `\r`.
fn replace_first_line(text: &str, identifier: &str, new_line: &str) -> Option<String> {
    let (body, trailing) = match text.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (text, ""),
    };
    let mut lines: Vec<String> = body.split('\n').map(String::from).collect();
    let index = lines
        .iter()
        .position(|line| line.trim_end_matches('\r').contains(identifier))?;
    let ending = if lines[index].ends_with('\r') { "\r" } else { "" };
    lines[index] = format!("{}{ending}", new_line.trim_end_matches(['\r', '\n']));
    Some(format!("{}{trailing}", lines.join("\n")))
}
