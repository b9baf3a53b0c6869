//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;

/// skillport - Install agent skills from remote sources, pinned by a lockfile
#[derive(Parser, Debug)]
#[command(name = "skillport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout and JSON logs on stderr
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/skillport/config.toml + ./skillport.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project directory holding skillport.lock and .skillport/ (default: cwd)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve, fetch and lock every configured source
    Install(commands::install::InstallArgs),

    /// Check curated skills on disk against the lockfile
    Verify(commands::verify::VerifyArgs),

    /// Show lockfile entries
    Lock(commands::lock::LockArgs),
}
