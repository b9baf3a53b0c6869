//! Source installation: decide, fetch, verify and record each source.
//!
//! Sources are processed in configured order. For each one the installer
//! either trusts the existing lock entry (nothing to do on disk), or resolves
//! the source to a commit, lists its skills and fetches the ones it may
//! claim. Ordinary failures are confined to the source that raised them;
//! only the two frozen-mode violations abort the run.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SpError};
use crate::sources::client::{EntryKind, GitHost};
use crate::sources::curated::{CuratedStore, is_safe_name};
use crate::sources::fetch::fetch_skill_files;
use crate::sources::github::{GH_API, GitHubClient, token_from_env};
use crate::sources::integrity::{SkillFile, compute_integrity};
use crate::sources::local::LocalSkills;
use crate::sources::lock::{LockFile, LockStore, SkillLockEntry, SourceLockEntry};
use crate::sources::source::{ParsedSource, SourceHost, SourceSpec};
use crate::sources::ProjectPaths;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Do nothing at all.
    pub skip_sources: bool,
    /// Re-resolve every source even when the lock is satisfied on disk.
    pub update_sources: bool,
    /// Never resolve refs and never write the lock.
    pub frozen: bool,
    pub token: Option<String>,
    /// GitHub API base; the public API when unset.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Lock entry present and every locked skill is on disk.
    Trusted,
    /// Another configured spec normalized to the same key earlier in the run.
    Duplicate,
}

/// What happened to one configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Fetched {
        source: String,
        key: String,
        skills: Vec<String>,
    },
    Skipped {
        source: String,
        key: String,
        reason: SkipReason,
    },
    Failed {
        source: String,
        error: String,
    },
}

impl SourceOutcome {
    #[must_use]
    pub fn fetched_count(&self) -> usize {
        match self {
            Self::Fetched { skills, .. } => skills.len(),
            _ => 0,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Fetched { source, .. } | Self::Skipped { source, .. } | Self::Failed { source, .. } => {
                source
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallSummary {
    pub fetched_skill_count: usize,
    pub sources_processed: usize,
    pub outcomes: Vec<SourceOutcome>,
    /// Keys dropped from the lock because they are no longer configured.
    pub pruned: Vec<String>,
    pub lock_written: bool,
}

impl InstallSummary {
    fn from_outcomes(outcomes: Vec<SourceOutcome>) -> Self {
        Self {
            fetched_skill_count: outcomes.iter().map(SourceOutcome::fetched_count).sum(),
            sources_processed: outcomes.len(),
            outcomes,
            pruned: Vec::new(),
            lock_written: false,
        }
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SourceOutcome::Failed { .. }))
            .count()
    }
}

/// Install every source into `base_dir` using the GitHub API.
///
/// The token comes from `options.token` or the environment.
pub fn resolve_and_fetch_sources(
    sources: &[SourceSpec],
    base_dir: &Path,
    options: &InstallOptions,
) -> Result<InstallSummary> {
    if options.skip_sources || sources.is_empty() {
        return Ok(InstallSummary::default());
    }
    let token = options.token.clone().or_else(token_from_env);
    let api_url = options.api_url.as_deref().unwrap_or(GH_API);
    let client = GitHubClient::with_api_url(api_url, token)?;
    Installer::new(&client, base_dir).run(sources, options)
}

pub struct Installer<'a> {
    client: &'a dyn GitHost,
    lock_store: LockStore,
    local: LocalSkills,
    curated: CuratedStore,
}

impl<'a> Installer<'a> {
    pub fn new(client: &'a dyn GitHost, base_dir: &Path) -> Self {
        let paths = ProjectPaths::new(base_dir);
        Self {
            client,
            lock_store: LockStore::new(paths.lockfile()),
            local: LocalSkills::new(paths.local_skills()),
            curated: CuratedStore::new(paths.curated_skills()),
        }
    }

    pub fn run(&self, sources: &[SourceSpec], options: &InstallOptions) -> Result<InstallSummary> {
        if options.skip_sources {
            tracing::info!("skipping remote sources");
            return Ok(InstallSummary::default());
        }
        if sources.is_empty() {
            return Ok(InstallSummary::default());
        }
        if options.frozen && options.update_sources {
            tracing::warn!("--update has no effect in frozen mode");
        }

        let parsed: Vec<(&SourceSpec, Result<ParsedSource>)> = sources
            .iter()
            .map(|spec| (spec, ParsedSource::parse(&spec.source)))
            .collect();

        let previous = self.lock_store.read()?;
        if options.frozen {
            let missing: Vec<String> = parsed
                .iter()
                .filter_map(|(spec, parsed)| {
                    let parsed = parsed.as_ref().ok()?;
                    previous
                        .source(&parsed.key())
                        .is_none()
                        .then(|| spec.source.clone())
                })
                .collect();
            if !missing.is_empty() {
                return Err(SpError::FrozenMissingEntries { sources: missing });
            }
            for (spec, parsed) in &parsed {
                let Ok(parsed) = parsed else { continue };
                if let Some(entry) = previous.source(&parsed.key()) {
                    if entry.requested_ref != parsed.git_ref {
                        return Err(SpError::FrozenRefMismatch {
                            source_id: spec.source.clone(),
                            locked: entry.requested_ref.clone(),
                            requested: parsed.git_ref.clone(),
                        });
                    }
                }
            }
        }

        let mut next = previous.clone();
        let mut claimed = HashSet::new();
        let mut seen_keys = HashSet::new();
        let mut outcomes = Vec::with_capacity(parsed.len());

        for (spec, parsed) in &parsed {
            let outcome = match parsed {
                Ok(parsed) => self.process_source(
                    spec,
                    parsed,
                    &previous,
                    &mut next,
                    &mut claimed,
                    &mut seen_keys,
                    options,
                )?,
                Err(err) => {
                    tracing::warn!(source = %spec.source, error = %err, "invalid source; skipping");
                    SourceOutcome::Failed {
                        source: spec.source.clone(),
                        error: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let mut summary = InstallSummary::from_outcomes(outcomes);
        if !options.frozen {
            let configured: HashSet<String> = parsed
                .iter()
                .filter_map(|(_, parsed)| parsed.as_ref().ok().map(ParsedSource::key))
                .collect();
            summary.pruned = next.retain_sources(|key| configured.contains(key));
            for key in &summary.pruned {
                tracing::info!(source = %key, "pruned lock entry for removed source");
            }
            if next != previous {
                self.lock_store.write(&next)?;
                summary.lock_written = true;
            }
        }

        tracing::info!(
            fetched = summary.fetched_skill_count,
            sources = summary.sources_processed,
            failed = summary.failed(),
            "source install finished"
        );
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_source(
        &self,
        spec: &SourceSpec,
        parsed: &ParsedSource,
        previous: &LockFile,
        next: &mut LockFile,
        claimed: &mut HashSet<String>,
        seen_keys: &mut HashSet<String>,
        options: &InstallOptions,
    ) -> Result<SourceOutcome> {
        let key = parsed.key();
        if !seen_keys.insert(key.clone()) {
            tracing::debug!(source = %spec.source, %key, "source already processed this run");
            return Ok(SourceOutcome::Skipped {
                source: spec.source.clone(),
                key,
                reason: SkipReason::Duplicate,
            });
        }

        let prior = previous.source(&key);
        let update = options.update_sources && !options.frozen;
        let same_pin = prior.is_some_and(|entry| entry.requested_ref == parsed.git_ref);
        if prior.is_some() && !same_pin && !options.frozen {
            tracing::info!(source = %spec.source, %key, "pinned ref changed; re-resolving");
        }
        if let Some(entry) = prior.filter(|entry| !update && same_pin && self.lock_satisfied(entry)) {
            claimed.extend(entry.skills.keys().cloned());
            tracing::debug!(source = %spec.source, %key, "lock satisfied on disk; no fetch");
            return Ok(SourceOutcome::Skipped {
                source: spec.source.clone(),
                key,
                reason: SkipReason::Trusted,
            });
        }

        let result = if options.frozen {
            match prior {
                Some(entry) => self.fetch_frozen(parsed, &key, entry, claimed),
                None => Err(SpError::FrozenMissingEntries {
                    sources: vec![spec.source.clone()],
                }),
            }
        } else {
            self.fetch_resolved(spec, parsed, &key, prior, claimed)
                .map(|(entry, skills)| {
                    next.sources.insert(key.clone(), entry);
                    skills
                })
        };

        match result {
            Ok(skills) => Ok(SourceOutcome::Fetched {
                source: spec.source.clone(),
                key,
                skills,
            }),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::warn!(source = %spec.source, error = %err, "failed to fetch source; continuing");
                Ok(SourceOutcome::Failed {
                    source: spec.source.clone(),
                    error: err.to_string(),
                })
            }
        }
    }

    /// Every locked skill is either cached or shadowed by a local skill.
    fn lock_satisfied(&self, entry: &SourceLockEntry) -> bool {
        entry
            .skills
            .keys()
            .all(|name| self.curated.contains(name) || self.local.contains(name))
    }

    /// Fetch locked skills missing from disk at the locked commit.
    fn fetch_frozen(
        &self,
        parsed: &ParsedSource,
        key: &str,
        entry: &SourceLockEntry,
        claimed: &mut HashSet<String>,
    ) -> Result<Vec<String>> {
        ensure_supported(parsed)?;
        let mut fetched = Vec::new();
        for (name, locked) in &entry.skills {
            if !is_safe_name(name) {
                tracing::warn!(source = %key, skill = %name, "ignoring unsafe locked skill name");
                continue;
            }
            if self.local.contains(name) || !claimed.insert(name.clone()) {
                continue;
            }
            if self.curated.contains(name) {
                continue;
            }

            let skill_path = format!("{}/{name}", parsed.skills_path);
            let files = fetch_skill_files(self.client, &parsed.repo, &skill_path, &entry.resolved_ref)?;
            let integrity = compute_integrity(&files);
            if integrity != locked.integrity {
                return Err(SpError::FrozenIntegrityMismatch {
                    source_key: key.to_string(),
                    skill: name.clone(),
                    expected: locked.integrity.clone(),
                    actual: integrity,
                });
            }
            self.curated.write(name, &files)?;
            tracing::info!(source = %key, skill = %name, sha = %entry.resolved_ref, "restored locked skill");
            fetched.push(name.clone());
        }
        Ok(fetched)
    }

    /// Resolve the source to a commit and fetch every skill it may claim.
    fn fetch_resolved(
        &self,
        spec: &SourceSpec,
        parsed: &ParsedSource,
        key: &str,
        prior: Option<&SourceLockEntry>,
        claimed: &mut HashSet<String>,
    ) -> Result<(SourceLockEntry, Vec<String>)> {
        ensure_supported(parsed)?;
        let repo = &parsed.repo;

        let git_ref = match &parsed.git_ref {
            Some(git_ref) => git_ref.clone(),
            None => self.client.default_branch(repo)?,
        };
        let commit = self.client.resolve_ref(repo, &git_ref)?;
        tracing::debug!(source = %key, git_ref = %git_ref, sha = %commit, "resolved source");

        let listed = match self.client.list_dir(repo, &parsed.skills_path, &commit) {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => {
                tracing::debug!(source = %key, path = %parsed.skills_path, "source has no skills directory");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let mut entry = SourceLockEntry::new(commit.clone(), parsed.git_ref.clone());
        let mut downloaded = Vec::new();

        // Download and digest every claimed skill before touching the cache;
        // a failure here leaves disk and lock as they were.
        for remote in listed {
            if remote.kind != EntryKind::Dir {
                continue;
            }
            let name = remote.name;
            if !is_safe_name(&name) {
                tracing::debug!(source = %key, skill = ?name, "skipping unsafe skill name");
                continue;
            }
            if !spec.allows(&name) {
                continue;
            }
            if self.local.contains(&name) {
                tracing::debug!(source = %key, skill = %name, "local skill takes precedence");
                if let Some(locked) = prior.and_then(|p| p.skills.get(&name)) {
                    entry.skills.insert(name, locked.clone());
                }
                continue;
            }
            if !claimed.insert(name.clone()) {
                tracing::debug!(source = %key, skill = %name, "skill claimed by an earlier source");
                continue;
            }

            let skill_path = format!("{}/{name}", parsed.skills_path);
            let files = fetch_skill_files(self.client, repo, &skill_path, &commit)?;
            let integrity = compute_integrity(&files);
            downloaded.push((name, files, integrity));
        }

        let mut written: Vec<String> = Vec::new();
        for (name, files, integrity) in downloaded {
            let prior_integrity = prior.and_then(|p| p.integrity(&name));
            if let Err(err) = self.replace_curated(&name, &files, prior_integrity.is_some()) {
                // Anything already replaced no longer matches the old lock;
                // drop it so the next run sees it as missing.
                for done in written.iter().chain(std::iter::once(&name)) {
                    if let Err(cleanup) = self.curated.remove(done) {
                        tracing::warn!(source = %key, skill = %done, error = %cleanup, "failed to remove partial skill");
                    }
                }
                return Err(err);
            }
            warn_on_drift(key, &name, prior, &commit, &integrity, prior_integrity);
            tracing::info!(source = %key, skill = %name, files = files.len(), "fetched skill");
            entry.skills.insert(name.clone(), SkillLockEntry { integrity });
            written.push(name);
        }

        Ok((entry, written))
    }

    /// Previously locked skills are removed first so stale files don't linger.
    fn replace_curated(&self, name: &str, files: &[SkillFile], was_locked: bool) -> Result<()> {
        if was_locked {
            self.curated.remove(name)?;
        }
        self.curated.write(name, files)?;
        Ok(())
    }
}

fn warn_on_drift(
    key: &str,
    name: &str,
    prior: Option<&SourceLockEntry>,
    commit: &str,
    integrity: &str,
    prior_integrity: Option<&str>,
) {
    if let Some(expected) = prior_integrity.filter(|expected| *expected != integrity) {
        tracing::warn!(
            source = %key,
            skill = %name,
            expected = %expected,
            actual = %integrity,
            same_commit = prior.is_some_and(|p| p.resolved_ref == commit),
            "integrity mismatch; accepting fetched content"
        );
    }
}

fn ensure_supported(parsed: &ParsedSource) -> Result<()> {
    match &parsed.host {
        SourceHost::GitHub => Ok(()),
        other => Err(SpError::UnsupportedHost {
            host: other.to_string(),
            source_id: parsed.key(),
        }),
    }
}
