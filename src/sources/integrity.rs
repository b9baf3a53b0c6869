//! Deterministic content digests for skill file sets.
//!
//! Digest contract, version 1: files are ordered by their `/`-separated
//! relative path (byte order). For each file the stream carries the path
//! bytes, a NUL byte, the content length as a big-endian `u64`, then the
//! content. The SHA-256 of that stream is rendered as `sha256-<hex>`.
//! File permissions and timestamps do not participate.

use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{Result, SpError};

pub const INTEGRITY_PREFIX: &str = "sha256-";

/// One file of a skill, addressed relative to the skill directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillFile {
    pub relative_path: String,
    pub contents: Vec<u8>,
}

impl SkillFile {
    pub fn new(relative_path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: normalize_separators(&relative_path.into()),
            contents: contents.into(),
        }
    }
}

pub fn compute_integrity(files: &[SkillFile]) -> String {
    let mut ordered: Vec<(String, &[u8])> = files
        .iter()
        .map(|f| (normalize_separators(&f.relative_path), f.contents.as_slice()))
        .collect();
    ordered.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let mut hasher = Sha256::new();
    for (path, contents) in ordered {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_be_bytes());
        hasher.update(contents);
    }
    format!("{INTEGRITY_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Digest of a skill directory already on disk.
pub fn integrity_of_dir(dir: &Path) -> Result<String> {
    Ok(compute_integrity(&read_dir_files(dir)?))
}

pub fn read_dir_files(dir: &Path) -> Result<Vec<SkillFile>> {
    if !dir.is_dir() {
        return Err(SpError::ValidationFailed(format!(
            "not a directory: {}",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry
            .map_err(|err| SpError::Config(format!("walk {}: {err}", dir.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let contents = std::fs::read(entry.path()).map_err(|err| {
            SpError::Config(format!("read {}: {err}", entry.path().display()))
        })?;
        files.push(SkillFile::new(relative, contents));
    }
    Ok(files)
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
