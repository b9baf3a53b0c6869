//! Remote skill sources: resolution, verified fetch and the lockfile.

pub mod client;
pub mod curated;
pub mod fetch;
pub mod github;
pub mod install;
pub mod integrity;
pub mod local;
pub mod lock;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod source;

use std::path::PathBuf;

pub use client::{EntryKind, GitHost, RemoteEntry};
pub use curated::CuratedStore;
pub use github::GitHubClient;
pub use install::{
    InstallOptions, InstallSummary, Installer, SkipReason, SourceOutcome,
    resolve_and_fetch_sources,
};
pub use integrity::{SkillFile, compute_integrity, integrity_of_dir};
pub use local::LocalSkills;
pub use lock::{LockFile, LockStore, SkillLockEntry, SourceLockEntry};
pub use source::{ParsedSource, RepoRef, SourceHost, SourceSpec};

pub const LOCKFILE_NAME: &str = "skillport.lock";
pub const SKILLS_DIR: &str = ".skillport/skills";
pub const CURATED_DIR: &str = ".curated";

/// Fixed project-relative locations.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    base: PathBuf,
}

impl ProjectPaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn lockfile(&self) -> PathBuf {
        self.base.join(LOCKFILE_NAME)
    }

    pub fn local_skills(&self) -> PathBuf {
        self.base.join(SKILLS_DIR)
    }

    pub fn curated_skills(&self) -> PathBuf {
        self.local_skills().join(CURATED_DIR)
    }
}
