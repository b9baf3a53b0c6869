//! In-memory [`GitHost`] for tests.
//!
//! Repositories hold a flat map of file paths; directories are derived from
//! those paths. Every call is recorded so tests can assert which network
//! operations happened, and failures can be injected per repo and operation.
//!
//! ```rust,ignore
//! let host = MockGitHost::new();
//! host.add_repo("owner/repo", "main", "c1")
//!     .file("skills/pdf/SKILL.md", "# PDF");
//! host.fail("owner/repo", MockOp::ResolveRef, MockFailure::Status(500));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SpError};
use crate::sources::client::{EntryKind, GitHost, RemoteEntry};
use crate::sources::source::RepoRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    DefaultBranch { repo: String },
    ResolveRef { repo: String, git_ref: String },
    ListDir { repo: String, path: String, commit: String },
    FileContent { repo: String, path: String, commit: String },
}

impl MockCall {
    pub fn repo(&self) -> &str {
        match self {
            Self::DefaultBranch { repo }
            | Self::ResolveRef { repo, .. }
            | Self::ListDir { repo, .. }
            | Self::FileContent { repo, .. } => repo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    DefaultBranch,
    ResolveRef,
    ListDir,
    FileContent,
}

#[derive(Debug, Clone)]
pub enum MockFailure {
    Status(u16),
    Transport(String),
}

impl MockFailure {
    fn to_error(&self, resource: &str) -> SpError {
        match self {
            Self::Status(status) => SpError::Remote {
                status: *status,
                resource: resource.to_string(),
            },
            Self::Transport(message) => SpError::Http(message.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct MockRepo {
    default_branch: String,
    refs: HashMap<String, String>,
    files: BTreeMap<String, Vec<u8>>,
    /// Sizes reported by listings instead of the real content length.
    listed_sizes: HashMap<String, u64>,
}

impl MockRepo {
    fn knows_commit(&self, commit: &str) -> bool {
        self.refs.values().any(|sha| sha == commit)
    }
}

#[derive(Debug, Default)]
pub struct MockGitHost {
    repos: RefCell<HashMap<String, MockRepo>>,
    failures: RefCell<HashMap<(String, MockOp), MockFailure>>,
    calls: RefCell<Vec<MockCall>>,
}

impl MockGitHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `owner/repo` whose default branch points at `commit`.
    pub fn add_repo(&self, name: &str, default_branch: &str, commit: &str) -> MockRepoBuilder<'_> {
        let mut repo = MockRepo {
            default_branch: default_branch.to_string(),
            ..MockRepo::default()
        };
        repo.refs
            .insert(default_branch.to_string(), commit.to_string());
        self.repos.borrow_mut().insert(name.to_string(), repo);
        MockRepoBuilder {
            host: self,
            name: name.to_string(),
        }
    }

    /// Replace or add a file in an existing repo.
    pub fn set_file(&self, repo: &str, path: &str, contents: impl Into<Vec<u8>>) {
        if let Some(entry) = self.repos.borrow_mut().get_mut(repo) {
            entry
                .files
                .insert(path.trim_matches('/').to_string(), contents.into());
        }
    }

    pub fn remove_file(&self, repo: &str, path: &str) {
        if let Some(entry) = self.repos.borrow_mut().get_mut(repo) {
            entry.files.remove(path.trim_matches('/'));
        }
    }

    /// Make listings report `size` for `path` regardless of its content.
    pub fn set_listed_size(&self, repo: &str, path: &str, size: u64) {
        if let Some(entry) = self.repos.borrow_mut().get_mut(repo) {
            entry
                .listed_sizes
                .insert(path.trim_matches('/').to_string(), size);
        }
    }

    /// Add or move `git_ref` to `commit`.
    pub fn set_ref(&self, repo: &str, git_ref: &str, commit: &str) {
        if let Some(entry) = self.repos.borrow_mut().get_mut(repo) {
            entry.refs.insert(git_ref.to_string(), commit.to_string());
        }
    }

    pub fn fail(&self, repo: &str, op: MockOp, failure: MockFailure) {
        self.failures
            .borrow_mut()
            .insert((repo.to_string(), op), failure);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, repo: &str) -> Vec<MockCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.repo() == repo)
            .cloned()
            .collect()
    }

    pub fn resolve_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, MockCall::ResolveRef { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: MockCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check_failure(&self, repo: &str, op: MockOp, resource: &str) -> Result<()> {
        match self.failures.borrow().get(&(repo.to_string(), op)) {
            Some(failure) => Err(failure.to_error(resource)),
            None => Ok(()),
        }
    }

    fn with_repo<T>(&self, repo: &str, f: impl FnOnce(&MockRepo) -> Result<T>) -> Result<T> {
        let repos = self.repos.borrow();
        let entry = repos.get(repo).ok_or_else(|| SpError::Remote {
            status: 404,
            resource: repo.to_string(),
        })?;
        f(entry)
    }
}

pub struct MockRepoBuilder<'a> {
    host: &'a MockGitHost,
    name: String,
}

impl MockRepoBuilder<'_> {
    #[must_use]
    pub fn file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.host.set_file(&self.name, path, contents);
        self
    }

    #[must_use]
    pub fn git_ref(self, git_ref: &str, commit: &str) -> Self {
        self.host.set_ref(&self.name, git_ref, commit);
        self
    }
}

impl GitHost for MockGitHost {
    fn default_branch(&self, repo: &RepoRef) -> Result<String> {
        let name = repo.to_string();
        self.record(MockCall::DefaultBranch { repo: name.clone() });
        self.check_failure(&name, MockOp::DefaultBranch, &name)?;
        self.with_repo(&name, |entry| Ok(entry.default_branch.clone()))
    }

    fn resolve_ref(&self, repo: &RepoRef, git_ref: &str) -> Result<String> {
        let name = repo.to_string();
        self.record(MockCall::ResolveRef {
            repo: name.clone(),
            git_ref: git_ref.to_string(),
        });
        let resource = format!("{name}@{git_ref}");
        self.check_failure(&name, MockOp::ResolveRef, &resource)?;
        self.with_repo(&name, |entry| {
            entry.refs.get(git_ref).cloned().ok_or(SpError::Remote {
                status: 404,
                resource,
            })
        })
    }

    fn list_dir(&self, repo: &RepoRef, path: &str, commit: &str) -> Result<Vec<RemoteEntry>> {
        let name = repo.to_string();
        self.record(MockCall::ListDir {
            repo: name.clone(),
            path: path.to_string(),
            commit: commit.to_string(),
        });
        let resource = format!("{name}:{path}");
        self.check_failure(&name, MockOp::ListDir, &resource)?;
        self.with_repo(&name, |entry| {
            let not_found = || SpError::Remote {
                status: 404,
                resource: resource.clone(),
            };
            if !entry.knows_commit(commit) {
                return Err(not_found());
            }
            let dir = path.trim_matches('/');
            if entry.files.contains_key(dir) {
                return Err(SpError::ValidationFailed(format!("{resource} is not a directory")));
            }
            let prefix = if dir.is_empty() {
                String::new()
            } else {
                format!("{dir}/")
            };
            let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
            for file in entry.files.keys() {
                let Some(rest) = file.strip_prefix(&prefix) else {
                    continue;
                };
                match rest.split_once('/') {
                    Some((child, _)) => {
                        children.insert(child.to_string(), EntryKind::Dir);
                    }
                    None => {
                        children.entry(rest.to_string()).or_insert(EntryKind::File);
                    }
                }
            }
            if children.is_empty() {
                return Err(not_found());
            }
            Ok(children
                .into_iter()
                .map(|(child, kind)| RemoteEntry {
                    path: format!("{prefix}{child}"),
                    size: match kind {
                        EntryKind::File => {
                            let path = format!("{prefix}{child}");
                            entry.listed_sizes.get(&path).copied().or_else(|| {
                                entry.files.get(&path).map(|bytes| bytes.len() as u64)
                            })
                        }
                        _ => None,
                    },
                    name: child,
                    kind,
                })
                .collect())
        })
    }

    fn file_content(&self, repo: &RepoRef, path: &str, commit: &str) -> Result<Vec<u8>> {
        let name = repo.to_string();
        self.record(MockCall::FileContent {
            repo: name.clone(),
            path: path.to_string(),
            commit: commit.to_string(),
        });
        let resource = format!("{name}:{path}");
        self.check_failure(&name, MockOp::FileContent, &resource)?;
        self.with_repo(&name, |entry| {
            if !entry.knows_commit(commit) {
                return Err(SpError::Remote {
                    status: 404,
                    resource: resource.clone(),
                });
            }
            entry
                .files
                .get(path.trim_matches('/'))
                .cloned()
                .ok_or_else(|| SpError::Remote {
                    status: 404,
                    resource: resource.clone(),
                })
        })
    }
}
