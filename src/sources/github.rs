//! GitHub REST implementation of [`GitHost`].

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SpError};
use crate::sources::client::{EntryKind, GitHost, RemoteEntry};
use crate::sources::source::RepoRef;

pub const GH_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("skillport/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest single file we accept from the contents API (16 MB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Token from the environment, checked in priority order.
pub fn token_from_env() -> Option<String> {
    ["SKILLPORT_GITHUB_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

pub struct GitHubClient {
    client: reqwest::blocking::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_api_url(GH_API, token)
    }

    pub fn with_api_url(api_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SpError::Http(format!("build http client: {err}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, url: &str, accept: &str) -> Result<reqwest::blocking::Response> {
        let mut request = self.client.get(url).header("Accept", accept);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        tracing::trace!(%url, "github request");
        request
            .send()
            .map_err(|err| SpError::Http(format!("github request failed: {err}")))
    }

    fn get_ok(
        &self,
        url: &str,
        accept: &str,
        resource: &str,
    ) -> Result<reqwest::blocking::Response> {
        let response = self.get(url, accept)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpError::Remote {
                status: status.as_u16(),
                resource: resource.to_string(),
            });
        }
        Ok(response)
    }

    fn contents_url(&self, repo: &RepoRef, path: &str, commit: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_url,
            encode_segment(&repo.owner),
            encode_segment(&repo.repo),
            encode_path(path),
            urlencoding::encode(commit)
        )
    }
}

impl GitHost for GitHubClient {
    fn default_branch(&self, repo: &RepoRef) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}",
            self.api_url,
            encode_segment(&repo.owner),
            encode_segment(&repo.repo)
        );
        let response = self.get_ok(&url, "application/vnd.github+json", &repo.to_string())?;
        let info = response
            .json::<RepoInfo>()
            .map_err(|err| SpError::Http(format!("parse repository info for {repo}: {err}")))?;
        Ok(info.default_branch)
    }

    fn resolve_ref(&self, repo: &RepoRef, git_ref: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_url,
            encode_segment(&repo.owner),
            encode_segment(&repo.repo),
            encode_path(git_ref)
        );
        let response = self.get_ok(
            &url,
            "application/vnd.github.sha",
            &format!("{repo}@{git_ref}"),
        )?;
        let body = response
            .text()
            .map_err(|err| SpError::Http(format!("read commit sha for {repo}@{git_ref}: {err}")))?;
        let sha = body.trim().to_string();
        if sha.len() < 40 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SpError::ValidationFailed(format!(
                "unexpected commit id for {repo}@{git_ref}: {}",
                sha.chars().take(80).collect::<String>()
            )));
        }
        Ok(sha)
    }

    fn list_dir(&self, repo: &RepoRef, path: &str, commit: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.contents_url(repo, path, commit);
        let response = self.get_ok(&url, "application/vnd.github+json", &format!("{repo}:{path}"))?;
        let value = response
            .json::<serde_json::Value>()
            .map_err(|err| SpError::Http(format!("parse listing of {repo}:{path}: {err}")))?;
        if !value.is_array() {
            return Err(SpError::ValidationFailed(format!(
                "{repo}:{path} is not a directory"
            )));
        }
        let entries: Vec<ContentEntry> = serde_json::from_value(value)?;
        Ok(entries
            .into_iter()
            .map(|entry| RemoteEntry {
                kind: match entry.kind.as_str() {
                    "file" => EntryKind::File,
                    "dir" => EntryKind::Dir,
                    _ => EntryKind::Other,
                },
                name: entry.name,
                path: entry.path,
                size: entry.size,
            })
            .collect())
    }

    fn file_content(&self, repo: &RepoRef, path: &str, commit: &str) -> Result<Vec<u8>> {
        let url = self.contents_url(repo, path, commit);
        let response = self.get_ok(&url, "application/vnd.github.raw", &format!("{repo}:{path}"))?;

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_FILE_SIZE {
                return Err(SpError::ValidationFailed(format!(
                    "{repo}:{path} too large: {content_length} bytes (max {} MB)",
                    MAX_FILE_SIZE / (1024 * 1024)
                )));
            }
        }

        let mut bytes = Vec::new();
        response
            .take(MAX_FILE_SIZE + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| SpError::Http(format!("read {repo}:{path}: {err}")))?;
        if bytes.len() as u64 > MAX_FILE_SIZE {
            return Err(SpError::ValidationFailed(format!(
                "{repo}:{path} exceeded size limit ({} MB)",
                MAX_FILE_SIZE / (1024 * 1024)
            )));
        }
        Ok(bytes)
    }
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Encode each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}
