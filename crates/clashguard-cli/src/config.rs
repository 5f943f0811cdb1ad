use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clashguard_check::DEFAULT_PROGRESS_INTERVAL;
use clashguard_installed::{default_repositories, RepositoryConfig};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "CLASHGUARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    pub repositories: Vec<RepositoryConfig>,
    pub extra_ignore: Vec<String>,
    pub discover_info_dir: bool,
    pub progress_interval: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            extra_ignore: Vec::new(),
            discover_info_dir: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl CheckConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("failed to parse clashguard config")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Configured repositories, or the standard locations under `root`.
    pub fn repositories_for(&self, root: &Path) -> Vec<RepositoryConfig> {
        if self.repositories.is_empty() {
            return default_repositories(root);
        }
        self.repositories.clone()
    }
}
