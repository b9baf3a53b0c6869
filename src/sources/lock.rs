//! Persisted lock state: resolved commits and per-skill integrity.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpError};

pub const LOCKFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    pub lockfile_version: u32,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceLockEntry>,
}

impl Default for LockFile {
    fn default() -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION,
            sources: BTreeMap::new(),
        }
    }
}

impl LockFile {
    pub fn source(&self, key: &str) -> Option<&SourceLockEntry> {
        self.sources.get(key)
    }

    /// Drop every entry whose key isn't in `keep`. Returns the removed keys.
    pub fn retain_sources<F>(&mut self, keep: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let removed: Vec<String> = self
            .sources
            .keys()
            .filter(|key| !keep(key))
            .cloned()
            .collect();
        for key in &removed {
            self.sources.remove(key);
        }
        removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLockEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_ref: Option<String>,
    pub resolved_ref: String,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillLockEntry>,
}

impl SourceLockEntry {
    pub fn new(resolved_ref: impl Into<String>, requested_ref: Option<String>) -> Self {
        Self {
            requested_ref,
            resolved_ref: resolved_ref.into(),
            skills: BTreeMap::new(),
        }
    }

    pub fn integrity(&self, skill: &str) -> Option<&str> {
        self.skills.get(skill).map(|entry| entry.integrity.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillLockEntry {
    pub integrity: String,
}

/// Reads and atomically writes the lockfile.
#[derive(Debug, Clone)]
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<LockFile> {
        if !self.path.exists() {
            return Ok(LockFile::default());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|err| {
            SpError::Config(format!("read lockfile {}: {err}", self.path.display()))
        })?;
        let lock: LockFile = serde_json::from_str(&raw).map_err(|err| {
            SpError::Config(format!("parse lockfile {}: {err}", self.path.display()))
        })?;
        if lock.lockfile_version > LOCKFILE_VERSION {
            return Err(SpError::Config(format!(
                "lockfile {} has version {}, newest supported is {LOCKFILE_VERSION}",
                self.path.display(),
                lock.lockfile_version
            )));
        }
        Ok(lock)
    }

    /// Persist the whole lock. Readers see either the old or the new file.
    pub fn write(&self, lock: &LockFile) -> Result<()> {
        let mut content = serde_json::to_string_pretty(lock)
            .map_err(|e| SpError::Config(format!("serialize lockfile: {e}")))?;
        content.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SpError::Config(format!("create lockfile dir: {e}")))?;
            }
        }

        let temp_path = self.path.with_extension("lock.tmp");
        let mut file = std::fs::File::create(&temp_path)
            .map_err(|e| SpError::Config(format!("create temp lockfile: {e}")))?;
        file.write_all(content.as_bytes())
            .map_err(|e| SpError::Config(format!("write temp lockfile: {e}")))?;
        file.sync_all()
            .map_err(|e| SpError::Config(format!("sync temp lockfile: {e}")))?;
        drop(file);

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            SpError::Config(format!("rename lockfile: {e}"))
        })?;

        tracing::debug!(path = %self.path.display(), sources = lock.sources.len(), "wrote lockfile");
        Ok(())
    }
}
