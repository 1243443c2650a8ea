//! In-process repository backend.
//!
//! Holds `path → text` with sha256 version tags. Directories exist only as
//! prefixes of file paths. Used by tests and by offline dry runs.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use crate::backend::{ConnectionInfo, Contents, Entry, EntryKind, RepositoryBackend};
use crate::error::RepoError;

/// One recorded commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub path: String,
    pub message: String,
    pub sha: String,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, String>,
    special: BTreeMap<String, EntryKind>,
    unreadable: BTreeSet<String>,
    commits: Vec<CommitRecord>,
}

pub struct MemoryBackend {
    repository: String,
    branch: String,
    state: RwLock<State>,
}

fn version_of(text: &str) -> String {
    hex(&Sha256::digest(text.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_under(path: &str, dir: &str) -> bool {
    dir.is_empty() || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

impl MemoryBackend {
    pub fn new(repository: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Seed files, replacing the whole tree.
    pub fn with_files<I, P, T>(self, files: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<String>,
        T: Into<String>,
    {
        let state = State {
            files: files
                .into_iter()
                .map(|(p, t)| (p.into(), t.into()))
                .collect(),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
            ..self
        }
    }

    /// Add a symlink or submodule entry at `path`.
    pub async fn insert_special(&self, path: impl Into<String>, kind: EntryKind) {
        self.state.write().await.special.insert(path.into(), kind);
    }

    /// Make lookups of `path` fail with `Forbidden`.
    pub async fn deny(&self, path: impl Into<String>) {
        self.state.write().await.unreadable.insert(path.into());
    }

    /// Current text of a file, if present.
    pub async fn file(&self, path: &str) -> Option<String> {
        self.state.read().await.files.get(path).cloned()
    }

    /// Every commit made through this backend, oldest first.
    pub async fn commits(&self) -> Vec<CommitRecord> {
        self.state.read().await.commits.clone()
    }

    fn not_found(&self, path: &str) -> RepoError {
        RepoError::FileNotFound {
            path: path.to_string(),
            branch: self.branch.clone(),
        }
    }
}

impl State {
    fn is_dir(&self, dir: &str) -> bool {
        dir.is_empty()
            || self
                .files
                .keys()
                .chain(self.special.keys())
                .any(|p| is_under(p, dir))
    }

    /// Immediate children of `dir`, sorted by path.
    fn children(&self, dir: &str) -> Vec<Entry> {
        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        let leaves = self
            .files
            .keys()
            .map(|p| (p, EntryKind::File))
            .chain(self.special.iter().map(|(p, k)| (p, *k)));

        for (path, kind) in leaves {
            if !is_under(path, dir) {
                continue;
            }
            let rest = if dir.is_empty() { path.as_str() } else { &path[dir.len() + 1..] };
            match rest.split_once('/') {
                Some((first, _)) => {
                    let child = if dir.is_empty() {
                        first.to_string()
                    } else {
                        format!("{dir}/{first}")
                    };
                    children.insert(child, EntryKind::Dir);
                }
                None => {
                    children.insert(path.clone(), kind);
                }
            }
        }

        children
            .into_iter()
            .map(|(path, kind)| Entry { path, kind })
            .collect()
    }
}

#[async_trait]
impl RepositoryBackend for MemoryBackend {
    fn repository(&self) -> &str {
        &self.repository
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn contents(&self, path: &str) -> Result<Contents, RepoError> {
        let state = self.state.read().await;
        if state.unreadable.contains(path) {
            return Err(RepoError::Forbidden(format!("'{path}' is not readable")));
        }
        if let Some(text) = state.files.get(path) {
            return Ok(Contents::File {
                path: path.to_string(),
                text: text.clone(),
                sha: version_of(text),
            });
        }
        if let Some(kind) = state.special.get(path) {
            return Ok(Contents::Other {
                path: path.to_string(),
                kind: *kind,
            });
        }
        if state.is_dir(path) {
            return Ok(Contents::Directory(state.children(path)));
        }
        Err(self.not_found(path))
    }

    async fn put_file(
        &self,
        path: &str,
        text: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<String, RepoError> {
        let mut state = self.state.write().await;
        let conflict = |reason: &str| RepoError::Conflict {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        match (state.files.get(path), sha) {
            (Some(current), Some(expected)) if version_of(current) != expected => {
                return Err(conflict("file changed since it was read"));
            }
            (Some(_), None) => return Err(conflict("file already exists; sha required")),
            (None, Some(_)) => return Err(self.not_found(path)),
            _ => {}
        }
        if path.is_empty() || state.is_dir(path) || state.special.contains_key(path) {
            return Err(conflict("path is not a regular file"));
        }

        let commit_sha = hex(&Sha256::digest(
            format!("{}\n{path}\n{message}\n{text}", state.commits.len()).as_bytes(),
        ))[..40]
            .to_string();
        state.files.insert(path.to_string(), text.to_string());
        state.commits.push(CommitRecord {
            path: path.to_string(),
            message: message.to_string(),
            sha: commit_sha.clone(),
        });
        Ok(commit_sha)
    }

    async fn verify(&self) -> Result<ConnectionInfo, RepoError> {
        Ok(ConnectionInfo {
            login: "memory".into(),
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            branch_exists: true,
        })
    }
}
