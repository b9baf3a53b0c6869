use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpError};
use crate::sources::source::SourceSpec;

pub const PROJECT_CONFIG_NAME: &str = "skillport.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub github: GitHubSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub update: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, base_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env_string("SKILLPORT_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                SpError::Config(format!("config file not found: {}", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(base_dir)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        // No config dir (e.g. stripped-down containers) just means no global layer.
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("skillport/config.toml"))
    }

    fn load_project(base_dir: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&base_dir.join(PROJECT_CONFIG_NAME))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SpError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = parse_patch(&raw)
            .map_err(|err| SpError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        // A layer that names sources replaces the list; order is significant.
        if let Some(sources) = patch.sources {
            self.sources = sources;
        }
        if let Some(patch) = patch.install {
            self.install.merge(patch);
        }
        if let Some(patch) = patch.github {
            self.github.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_bool("SKILLPORT_FROZEN") {
            self.install.frozen = value;
        }
        if let Some(value) = env_bool("SKILLPORT_UPDATE") {
            self.install.update = value;
        }
        if let Some(value) = env_string("SKILLPORT_GITHUB_API_URL") {
            self.github.api_url = Some(value);
        }
    }
}

impl InstallConfig {
    fn merge(&mut self, patch: InstallPatch) {
        if let Some(value) = patch.frozen {
            self.frozen = value;
        }
        if let Some(value) = patch.update {
            self.update = value;
        }
    }
}

impl GitHubSettings {
    fn merge(&mut self, patch: GitHubPatch) {
        if let Some(value) = patch.api_url {
            self.api_url = Some(value);
        }
        if let Some(value) = patch.token {
            self.token = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub sources: Option<Vec<SourceSpec>>,
    pub install: Option<InstallPatch>,
    pub github: Option<GitHubPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallPatch {
    pub frozen: Option<bool>,
    pub update: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GitHubPatch {
    pub api_url: Option<String>,
    pub token: Option<String>,
}

fn parse_patch(raw: &str) -> std::result::Result<ConfigPatch, toml::de::Error> {
    toml::from_str(raw)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
