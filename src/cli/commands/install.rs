//! skillport install - Resolve, fetch and lock every configured source.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::print_json;
use crate::error::Result;
use crate::sources::{
    InstallOptions, InstallSummary, SkipReason, SourceOutcome, resolve_and_fetch_sources,
};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Install exactly what the lockfile records; never resolve refs or write the lock
    #[arg(long)]
    pub frozen: bool,

    /// Re-resolve every source even when the lock is satisfied on disk
    #[arg(long)]
    pub update: bool,

    /// Do nothing with remote sources
    #[arg(long)]
    pub skip_sources: bool,

    /// GitHub token (overrides config and env)
    #[arg(long)]
    pub token: Option<String>,
}

impl InstallArgs {
    fn options(&self, ctx: &AppContext) -> InstallOptions {
        // Environment tokens are picked up by the installer when neither is set.
        let token = self
            .token
            .clone()
            .or_else(|| ctx.config.github.token.clone());
        InstallOptions {
            skip_sources: self.skip_sources,
            update_sources: self.update || ctx.config.install.update,
            frozen: self.frozen || ctx.config.install.frozen,
            token,
            api_url: ctx.config.github.api_url.clone(),
        }
    }
}

pub fn run(ctx: &AppContext, args: &InstallArgs) -> Result<()> {
    let options = args.options(ctx);

    let summary = resolve_and_fetch_sources(&ctx.config.sources, ctx.base_dir(), &options)?;

    if ctx.robot_mode {
        print_json(&summary)
    } else {
        print_human(&summary, &options);
        Ok(())
    }
}

fn print_human(summary: &InstallSummary, options: &InstallOptions) {
    if options.skip_sources {
        println!("{}", "Skipped remote sources".yellow());
        return;
    }
    if summary.sources_processed == 0 {
        println!("{}", "No sources configured".yellow());
        println!();
        println!("Add one to skillport.toml:");
        println!("  [[sources]]");
        println!("  source = \"owner/repo\"");
        return;
    }

    for outcome in &summary.outcomes {
        match outcome {
            SourceOutcome::Fetched { source, skills, .. } => {
                let detail = if skills.is_empty() {
                    "up to date".dimmed().to_string()
                } else {
                    skills.join(", ")
                };
                println!("{} {} {}", "✓".green(), source.bold(), detail);
            }
            SourceOutcome::Skipped { source, reason, .. } => {
                let why = match reason {
                    SkipReason::Trusted => "locked",
                    SkipReason::Duplicate => "duplicate",
                };
                println!("{} {} {}", "=".dimmed(), source.bold(), why.dimmed());
            }
            SourceOutcome::Failed { source, error } => {
                println!("{} {} {}", "✗".red(), source.bold(), error.red());
            }
        }
    }

    println!();
    println!(
        "{} skill(s) fetched from {} source(s)",
        summary.fetched_skill_count.to_string().bold(),
        summary.sources_processed
    );
    if !summary.pruned.is_empty() {
        println!("Pruned: {}", summary.pruned.join(", ").dimmed());
    }
    let failed = summary.failed();
    if failed > 0 {
        println!("{}", format!("{failed} source(s) failed").red());
    }
}
