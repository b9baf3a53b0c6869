//! Recursive download of one skill directory into memory.

use crate::error::{Result, SpError};
use crate::sources::client::{EntryKind, GitHost};
use crate::sources::curated::is_safe_entry_name;
use crate::sources::integrity::SkillFile;
use crate::sources::source::RepoRef;

/// Total bytes accepted for a single skill (32 MB).
pub const MAX_SKILL_BYTES: u64 = 32 * 1024 * 1024;
pub const MAX_DEPTH: usize = 16;

/// Read every file under `skill_path` at `commit`.
///
/// Paths in the result are relative to `skill_path`. Entries whose names
/// would leave their directory, symlinks and submodules are skipped. Listed
/// sizes are checked against the cap before any download.
pub fn fetch_skill_files(
    client: &dyn GitHost,
    repo: &RepoRef,
    skill_path: &str,
    commit: &str,
) -> Result<Vec<SkillFile>> {
    let mut files = Vec::new();
    let mut total: u64 = 0;
    let mut pending = vec![(skill_path.to_string(), String::new(), 0usize)];

    while let Some((remote_dir, relative_dir, depth)) = pending.pop() {
        if depth > MAX_DEPTH {
            return Err(SpError::ValidationFailed(format!(
                "{repo}:{skill_path} nests deeper than {MAX_DEPTH} levels"
            )));
        }
        for entry in client.list_dir(repo, &remote_dir, commit)? {
            if !is_safe_entry_name(&entry.name) {
                tracing::warn!(%repo, path = %entry.path, "skipping unsafe remote entry");
                continue;
            }
            let relative = if relative_dir.is_empty() {
                entry.name.clone()
            } else {
                format!("{relative_dir}/{}", entry.name)
            };
            let remote = format!("{remote_dir}/{}", entry.name);
            match entry.kind {
                EntryKind::Dir => pending.push((remote, relative, depth + 1)),
                EntryKind::File => {
                    if let Some(size) = entry.size {
                        check_total(repo, skill_path, total + size)?;
                    }
                    let contents = client.file_content(repo, &remote, commit)?;
                    total += contents.len() as u64;
                    check_total(repo, skill_path, total)?;
                    files.push(SkillFile::new(relative, contents));
                }
                EntryKind::Other => {
                    tracing::debug!(%repo, path = %entry.path, "skipping non-file entry");
                }
            }
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn check_total(repo: &RepoRef, skill_path: &str, total: u64) -> Result<()> {
    if total > MAX_SKILL_BYTES {
        return Err(SpError::ValidationFailed(format!(
            "{repo}:{skill_path} exceeds {} MB",
            MAX_SKILL_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}
