//! The curated cache: one directory per fetched remote skill.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SpError};
use crate::sources::integrity::SkillFile;

/// A bare name that is safe to use as a single path component.
#[must_use]
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// A file or directory name inside a skill. Anything goes except names that
/// change the directory they are joined onto.
#[must_use]
pub fn is_safe_entry_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[derive(Debug, Clone)]
pub struct CuratedStore {
    root: PathBuf,
}

impl CuratedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn skill_dir(&self, name: &str) -> Result<PathBuf> {
        if !is_safe_name(name) {
            return Err(SpError::ValidationFailed(format!(
                "unsafe skill name: {name:?}"
            )));
        }
        Ok(self.root.join(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.skill_dir(name).is_ok_and(|dir| dir.is_dir())
    }

    /// Remove one skill's directory. Never touches siblings or the root.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let dir = self.skill_dir(name)?;
        if !dir.is_dir() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)
            .map_err(|err| SpError::Config(format!("remove {}: {err}", dir.display())))?;
        Ok(true)
    }

    /// Write `files` into the skill's directory, overwriting existing files.
    pub fn write(&self, name: &str, files: &[SkillFile]) -> Result<PathBuf> {
        let dir = self.skill_dir(name)?;
        std::fs::create_dir_all(&dir)
            .map_err(|err| SpError::Config(format!("create {}: {err}", dir.display())))?;

        for file in files {
            let rel = Path::new(&file.relative_path);
            ensure_relative(rel)?;
            let path = dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    SpError::Config(format!("create {}: {err}", parent.display()))
                })?;
            }
            std::fs::write(&path, &file.contents)
                .map_err(|err| SpError::Config(format!("write {}: {err}", path.display())))?;
        }
        Ok(dir)
    }
}

fn ensure_relative(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return Err(SpError::ValidationFailed(format!(
            "skill file path must be relative: {}",
            path.display()
        )));
    }
    for comp in path.components() {
        match comp {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SpError::ValidationFailed(format!(
                    "skill file path contains invalid component: {}",
                    path.display()
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
