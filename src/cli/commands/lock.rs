//! skillport lock - Show lockfile entries.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::print_json;
use crate::error::Result;
use crate::sources::{LockFile, LockStore};

#[derive(Args, Debug, Default)]
pub struct LockArgs {
    /// Print only source keys and resolved commits
    #[arg(long)]
    pub short: bool,
}

pub fn run(ctx: &AppContext, args: &LockArgs) -> Result<()> {
    let store = LockStore::new(ctx.paths().lockfile());
    let lock = store.read()?;

    if ctx.robot_mode {
        return print_json(&lock);
    }

    if lock.sources.is_empty() {
        println!("{}", format!("No entries in {}", store.path().display()).yellow());
        return Ok(());
    }
    print_human(&lock, args.short);
    Ok(())
}

fn print_human(lock: &LockFile, short: bool) {
    for (key, entry) in &lock.sources {
        let requested = entry
            .requested_ref
            .as_deref()
            .map(|r| format!(" ({r})"))
            .unwrap_or_default();
        println!("{} {}{}", key.bold(), short_sha(&entry.resolved_ref).cyan(), requested.dimmed());
        if short {
            continue;
        }
        for (skill, locked) in &entry.skills {
            println!("  {skill:<24} {}", locked.integrity.dimmed());
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
