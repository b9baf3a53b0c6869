//! First-class local skills, which always shadow remote ones.

use std::path::PathBuf;

/// Locally authored skills live directly under the project skills dir.
/// Dot-prefixed entries (the curated cache among them) are not skills.
#[derive(Debug, Clone)]
pub struct LocalSkills {
    root: PathBuf,
}

impl LocalSkills {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !name.is_empty() && !name.starts_with('.') && self.root.join(name).is_dir()
    }
}
