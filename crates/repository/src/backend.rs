//! The storage seam behind [`RepositoryClient`](crate::RepositoryClient).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RepoError;

/// What kind of entry a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Submodule => "submodule",
        }
    }
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Full path from the repository root
    pub path: String,
    pub kind: EntryKind,
}

/// The result of looking up one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    File {
        path: String,
        text: String,
        /// Version tag required to update this file
        sha: String,
    },
    Directory(Vec<Entry>),
    Other { path: String, kind: EntryKind },
}

/// What `verify` learned about the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub login: String,
    pub repository: String,
    pub branch: String,
    pub branch_exists: bool,
}

/// A place files live.
///
/// A missing path is always `RepoError::FileNotFound`; the client decides
/// what that means for the operation at hand.
#[async_trait]
pub trait RepositoryBackend: Send + Sync {
    /// `owner/name` of the repository.
    fn repository(&self) -> &str;

    /// The branch every read and write targets.
    fn branch(&self) -> &str;

    /// Look up a path. The empty path is the repository root.
    async fn contents(&self, path: &str) -> Result<Contents, RepoError>;

    /// Create (`sha = None`) or update a file. Returns the commit sha.
    async fn put_file(
        &self,
        path: &str,
        text: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<String, RepoError>;

    /// Check credentials, repository access and the branch.
    async fn verify(&self) -> Result<ConnectionInfo, RepoError>;
}
