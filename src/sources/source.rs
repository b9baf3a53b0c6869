//! Source identifiers: parsing and lock-key normalization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpError};

/// Directory searched for skills when the identifier doesn't name one.
pub const DEFAULT_SKILLS_PATH: &str = "skills";

/// A configured source as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
}

impl SourceSpec {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            skills: None,
        }
    }

    #[must_use]
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = Some(skills.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the allow-list (if any) admits `name`.
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        self.skills
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceHost {
    GitHub,
    GitLab,
    Other(String),
}

impl SourceHost {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "github" | "github.com" | "www.github.com" => Self::GitHub,
            "gitlab" | "gitlab.com" | "www.gitlab.com" => Self::GitLab,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SourceHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "github"),
            Self::GitLab => write!(f, "gitlab"),
            Self::Other(host) => write!(f, "{host}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSource {
    pub host: SourceHost,
    pub repo: RepoRef,
    /// Ref pinned in the identifier (`@ref` or `/tree/<ref>`).
    pub git_ref: Option<String>,
    pub skills_path: String,
}

impl ParsedSource {
    /// Parse a source identifier.
    ///
    /// Accepted forms: `owner/repo[@ref]`, `host:owner/repo[@ref]`,
    /// `[https://]github.com/owner/repo[.git][/tree/<ref>[/<path>]]`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty source identifier"));
        }

        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        if let Some(rest) = without_scheme {
            return parse_url_path(input, rest);
        }
        if let Some((first, _)) = trimmed.split_once('/') {
            if first.contains('.') && !first.contains(':') {
                return parse_url_path(input, trimmed);
            }
        }

        let (host, rest) = match trimmed.split_once(':') {
            Some((host, rest)) => (SourceHost::from_name(host), rest),
            None => (SourceHost::GitHub, trimmed),
        };
        let (path, git_ref) = match rest.split_once('@') {
            Some((path, git_ref)) => {
                if git_ref.trim().is_empty() {
                    return Err(invalid(input, "empty ref after '@'"));
                }
                (path, Some(git_ref.trim().to_string()))
            }
            None => (rest, None),
        };
        let repo = parse_owner_repo(input, path)?;
        Ok(Self {
            host,
            repo,
            git_ref,
            skills_path: DEFAULT_SKILLS_PATH.to_string(),
        })
    }

    /// Normalized lock key. Every textual variant of one repository maps here.
    #[must_use]
    pub fn key(&self) -> String {
        let base = format!("{}/{}", self.repo.owner, self.repo.repo).to_ascii_lowercase();
        match &self.host {
            SourceHost::GitHub => base,
            other => format!("{other}:{base}"),
        }
    }
}

fn parse_url_path(input: &str, rest: &str) -> Result<ParsedSource> {
    if rest.contains(['?', '#']) {
        return Err(invalid(input, "query strings and fragments are not supported"));
    }
    let rest = rest.trim_end_matches('/');
    let (host_name, path) = rest
        .split_once('/')
        .ok_or_else(|| invalid(input, "URL has no repository path"))?;
    let host = SourceHost::from_name(host_name);

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    let (repo, mut git_ref) = match repo.split_once('@') {
        Some((_, git_ref)) if git_ref.is_empty() => {
            return Err(invalid(input, "empty ref after '@'"));
        }
        Some((repo, git_ref)) => (repo, Some(git_ref.to_string())),
        None => (repo, None),
    };
    let repo = parse_owner_repo(input, &format!("{owner}/{repo}"))?;

    let mut skills_path = DEFAULT_SKILLS_PATH.to_string();
    match segments.next() {
        None => {}
        Some("tree" | "blob") if git_ref.is_some() => {
            return Err(invalid(input, "ref given both with '@' and in the tree path"));
        }
        Some("tree" | "blob") => {
            let Some(reference) = segments.next() else {
                return Err(invalid(input, "tree URL has no ref"));
            };
            git_ref = Some(reference.to_string());
            let sub: Vec<&str> = segments.collect();
            if !sub.is_empty() {
                if sub.iter().any(|s| *s == "..") {
                    return Err(invalid(input, "path contains '..'"));
                }
                skills_path = sub.join("/");
            }
        }
        Some(other) => {
            return Err(invalid(input, &format!("unexpected URL segment '{other}'")));
        }
    }

    Ok(ParsedSource {
        host,
        repo,
        git_ref,
        skills_path,
    })
}

fn parse_owner_repo(input: &str, path: &str) -> Result<RepoRef> {
    let mut parts = path.split('/');
    let owner = parts.next().unwrap_or("").trim();
    let repo = parts.next().unwrap_or("").trim().trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return Err(invalid(input, "expected owner/repo"));
    }
    if parts.any(|part| !part.trim().is_empty()) {
        return Err(invalid(input, "too many path segments"));
    }
    for part in [owner, repo] {
        if part == "." || part == ".." || part.contains(['\\', '@', '?', '#']) {
            return Err(invalid(input, "invalid owner or repo name"));
        }
    }
    Ok(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

fn invalid(input: &str, reason: &str) -> SpError {
    SpError::InvalidSource {
        source_id: input.to_string(),
        reason: reason.to_string(),
    }
}
