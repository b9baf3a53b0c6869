//! Capability surface the installer needs from a git host.

use crate::error::Result;
use crate::sources::source::RepoRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, submodules and anything else we don't fetch.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    /// Path from the repository root.
    pub path: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
}

/// Read-only access to a hosted repository.
///
/// Implementations report HTTP failures as [`crate::SpError::Remote`] so
/// callers can tell a missing path from a broken request.
pub trait GitHost {
    fn default_branch(&self, repo: &RepoRef) -> Result<String>;

    /// Resolve a branch, tag or commit to an immutable commit id.
    fn resolve_ref(&self, repo: &RepoRef, git_ref: &str) -> Result<String>;

    fn list_dir(&self, repo: &RepoRef, path: &str, commit: &str) -> Result<Vec<RemoteEntry>>;

    fn file_content(&self, repo: &RepoRef, path: &str, commit: &str) -> Result<Vec<u8>>;
}
