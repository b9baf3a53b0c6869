//! skillport verify - Check curated skills on disk against the lockfile.

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::print_json;
use crate::error::{Result, SpError};
use crate::sources::{CuratedStore, LocalSkills, LockStore, ProjectPaths, integrity_of_dir};

#[derive(Args, Debug, Default)]
pub struct VerifyArgs {
    /// Only check skills recorded for this source key (e.g. owner/repo)
    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Ok,
    Modified,
    Missing,
    /// A local skill with the same name takes precedence; nothing to check.
    Shadowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCheck {
    pub source: String,
    pub skill: String,
    pub status: SkillStatus,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

/// Recompute the digest of every locked skill under `paths`.
pub fn check_skills(paths: &ProjectPaths, only_source: Option<&str>) -> Result<Vec<SkillCheck>> {
    let lock = LockStore::new(paths.lockfile()).read()?;
    let local = LocalSkills::new(paths.local_skills());
    let curated = CuratedStore::new(paths.curated_skills());

    let mut checks = Vec::new();
    for (key, entry) in &lock.sources {
        if only_source.is_some_and(|wanted| !wanted.eq_ignore_ascii_case(key)) {
            continue;
        }
        for (skill, locked) in &entry.skills {
            let (status, actual) = if local.contains(skill) {
                (SkillStatus::Shadowed, None)
            } else if !curated.contains(skill) {
                (SkillStatus::Missing, None)
            } else {
                let digest = integrity_of_dir(&curated.skill_dir(skill)?)?;
                let status = if digest == locked.integrity {
                    SkillStatus::Ok
                } else {
                    SkillStatus::Modified
                };
                (status, Some(digest))
            };
            checks.push(SkillCheck {
                source: key.clone(),
                skill: skill.clone(),
                status,
                expected: locked.integrity.clone(),
                actual,
            });
        }
    }
    Ok(checks)
}

pub fn run(ctx: &AppContext, args: &VerifyArgs) -> Result<()> {
    let checks = check_skills(&ctx.paths(), args.source.as_deref())?;
    let bad = checks
        .iter()
        .filter(|check| matches!(check.status, SkillStatus::Modified | SkillStatus::Missing))
        .count();

    if ctx.robot_mode {
        print_json(&serde_json::json!({
            "status": if bad == 0 { "ok" } else { "failed" },
            "checked": checks.len(),
            "skills": checks,
        }))?;
    } else {
        print_human(&checks);
    }

    if bad > 0 {
        return Err(SpError::ValidationFailed(format!(
            "{bad} skill(s) do not match the lockfile"
        )));
    }
    Ok(())
}

fn print_human(checks: &[SkillCheck]) {
    if checks.is_empty() {
        println!("{}", "No locked skills".yellow());
        return;
    }
    for check in checks {
        let label = match check.status {
            SkillStatus::Ok => "ok".green(),
            SkillStatus::Modified => "modified".red(),
            SkillStatus::Missing => "missing".red(),
            SkillStatus::Shadowed => "shadowed".dimmed(),
        };
        println!("{:>9} {} {}", label, check.skill.bold(), check.source.dimmed());
    }
}
