//! GitHub REST Contents API backend.
//!
//! - `GET  /repos/{owner}/{name}/contents/{path}?ref={branch}` to read or list
//! - `PUT  /repos/{owner}/{name}/contents/{path}` to create or update
//! - `GET  /user`, `GET /repos/{owner}/{name}`, `GET .../branches/{branch}` to verify

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gitscribe_config::RepositoryConfig;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{ConnectionInfo, Contents, Entry, EntryKind, RepositoryBackend};
use crate::error::RepoError;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";

pub struct GitHubBackend {
    api_url: Url,
    owner: String,
    name: String,
    full_name: String,
    branch: String,
    token: String,
    client: reqwest::Client,
}

impl GitHubBackend {
    /// Build a backend from the `[repository]` config section.
    pub fn new(config: &RepositoryConfig) -> Result<Self, RepoError> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| RepoError::Config("no GitHub token (set GITHUB_TOKEN)".into()))?;
        let repository = config
            .name
            .as_deref()
            .ok_or_else(|| RepoError::Config("no repository name (set GITHUB_REPO_NAME)".into()))?;
        Self::with_base_url(
            token,
            repository,
            &config.branch,
            &config.api_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_base_url(
        token: &str,
        repository: &str,
        branch: &str,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, RepoError> {
        let (owner, name) = repository
            .split_once('/')
            .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
            .ok_or_else(|| {
                RepoError::Config(format!("repository must be 'owner/name', got '{repository}'"))
            })?;

        let api_url = Url::parse(api_url)
            .map_err(|e| RepoError::Config(format!("invalid API url '{api_url}': {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("gitscribe/{VERSION}"))
            .build()
            .map_err(|e| RepoError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_url,
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: repository.to_string(),
            branch: branch.to_string(),
            token: token.to_string(),
            client,
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, RepoError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoError::Config(format!("API url '{}' cannot be a base", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url, RepoError> {
        let mut url = self.endpoint(
            ["repos", self.owner.as_str(), self.name.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/').filter(|s| !s.is_empty())),
        )?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.request_as(method, url, JSON_MEDIA_TYPE)
    }

    /// A request that sends exactly one `Accept` value.
    fn request_as(&self, method: Method, url: Url, accept: &'static str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Map a non-success response to a typed error.
    async fn status_error(&self, response: reqwest::Response, path: &str) -> RepoError {
        let status = response.status();
        let message = response
            .json::<ApiErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));

        match status {
            StatusCode::UNAUTHORIZED => RepoError::Unauthorized(message),
            StatusCode::FORBIDDEN => RepoError::Forbidden(message),
            StatusCode::NOT_FOUND => RepoError::FileNotFound {
                path: path.to_string(),
                branch: self.branch.clone(),
            },
            _ => RepoError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Files over 1 MB come back without inline content.
    async fn fetch_raw(&self, path: &str) -> Result<String, RepoError> {
        let response = self
            .request_as(Method::GET, self.contents_url(path)?, RAW_MEDIA_TYPE)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.status_error(response, path).await);
        }
        Ok(response.text().await?)
    }
}

fn parse_kind(kind: &str) -> EntryKind {
    match kind {
        "dir" => EntryKind::Dir,
        "symlink" => EntryKind::Symlink,
        "submodule" => EntryKind::Submodule,
        _ => EntryKind::File,
    }
}

fn decode_content(path: &str, content: &str) -> Result<String, RepoError> {
    let packed: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(packed)
        .map_err(|e| RepoError::Decode(format!("'{path}': {e}")))?;
    String::from_utf8(bytes).map_err(|_| RepoError::Decode(format!("'{path}' is not UTF-8 text")))
}

#[async_trait]
impl RepositoryBackend for GitHubBackend {
    fn repository(&self) -> &str {
        &self.full_name
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn contents(&self, path: &str) -> Result<Contents, RepoError> {
        debug!(path, branch = %self.branch, "GET contents");
        let response = self
            .request(Method::GET, self.contents_url(path)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.status_error(response, path).await);
        }

        match response.json::<ApiContents>().await? {
            ApiContents::Listing(entries) => Ok(Contents::Directory(
                entries
                    .into_iter()
                    .map(|e| Entry {
                        kind: parse_kind(&e.kind),
                        path: e.path,
                    })
                    .collect(),
            )),
            ApiContents::Item(item) => match parse_kind(&item.kind) {
                EntryKind::File => {
                    let text = match item.content.as_deref() {
                        Some(content) if !content.is_empty() || item.size == 0 => {
                            decode_content(&item.path, content)?
                        }
                        _ => self.fetch_raw(&item.path).await?,
                    };
                    Ok(Contents::File {
                        path: item.path,
                        text,
                        sha: item.sha,
                    })
                }
                kind => Ok(Contents::Other {
                    path: item.path,
                    kind,
                }),
            },
        }
    }

    async fn put_file(
        &self,
        path: &str,
        text: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<String, RepoError> {
        let mut body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(text),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::json!(sha);
        }

        let mut url = self.contents_url(path)?;
        url.set_query(None);
        debug!(path, branch = %self.branch, update = sha.is_some(), "PUT contents");

        let response = self.request(Method::PUT, url).json(&body).send().await?;
        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            let reason = response
                .json::<ApiErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(RepoError::Conflict {
                path: path.to_string(),
                reason,
            });
        }
        if status == StatusCode::NOT_FOUND {
            // A PUT creates missing paths, so 404 here means the branch or repository is gone.
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(RepoError::Api {
                status: 404,
                message: format!(
                    "cannot write '{path}': branch '{}' of '{}' not found ({message})",
                    self.branch, self.full_name
                ),
            });
        }
        if !status.is_success() {
            return Err(self.status_error(response, path).await);
        }

        let written: ApiWriteResponse = response.json().await?;
        Ok(written.commit.sha)
    }

    async fn verify(&self) -> Result<ConnectionInfo, RepoError> {
        let response = self.request(Method::GET, self.endpoint(["user"])?).send().await?;
        if !response.status().is_success() {
            return Err(self.status_error(response, "").await);
        }
        let user: ApiUser = response.json().await?;

        let repo_url = self.endpoint(["repos", self.owner.as_str(), self.name.as_str()])?;
        let response = self.request(Method::GET, repo_url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::Api {
                status: 404,
                message: format!(
                    "repository '{}' not found or not accessible with this token",
                    self.full_name
                ),
            });
        }
        if !response.status().is_success() {
            return Err(self.status_error(response, "").await);
        }
        let repo: ApiRepository = response.json().await?;

        let branch_url = self.endpoint([
            "repos",
            self.owner.as_str(),
            self.name.as_str(),
            "branches",
            self.branch.as_str(),
        ])?;
        let response = self.request(Method::GET, branch_url).send().await?;
        let branch_exists = match response.status() {
            s if s.is_success() => true,
            StatusCode::NOT_FOUND => {
                warn!(
                    repository = %repo.full_name,
                    branch = %self.branch,
                    default_branch = %repo.default_branch,
                    "Configured branch does not exist; writes will fail until it is created"
                );
                false
            }
            _ => return Err(self.status_error(response, "").await),
        };

        Ok(ConnectionInfo {
            login: user.login,
            repository: repo.full_name,
            branch: self.branch.clone(),
            branch_exists,
        })
    }
}

// --- GitHub API types (internal) ---

#[derive(Deserialize)]
#[serde(untagged)]
enum ApiContents {
    Listing(Vec<ApiEntry>),
    Item(ApiEntry),
}

#[derive(Deserialize)]
struct ApiEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiWriteResponse {
    commit: ApiCommit,
}

#[derive(Deserialize)]
struct ApiCommit {
    sha: String,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiRepository {
    full_name: String,
    #[serde(default)]
    default_branch: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
