//! Per-invocation state shared by every command.

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Result, SpError};
use crate::sources::ProjectPaths;

#[derive(Debug, Clone)]
pub struct AppContext {
    pub base_dir: PathBuf,
    pub config: Config,
    pub robot_mode: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let base_dir = match &cli.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|err| SpError::Config(format!("resolve current directory: {err}")))?,
        };
        if !base_dir.is_dir() {
            return Err(SpError::Config(format!(
                "base directory does not exist: {}",
                base_dir.display()
            )));
        }
        let config = Config::load(cli.config.as_deref(), &base_dir)?;
        tracing::debug!(
            base_dir = %base_dir.display(),
            sources = config.sources.len(),
            "loaded configuration"
        );
        Ok(Self {
            base_dir,
            config,
            robot_mode: cli.robot,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(&self.base_dir)
    }
}
