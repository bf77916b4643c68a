use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::mode::DEFAULT_USER;
use crate::save::DEFAULT_ACK_DELAY;

/// File looked up in the project root.
pub const CONFIG_FILE: &str = "casemap.toml";

/// Environment variable overriding `source.location`.
pub const SOURCE_ENV: &str = "CASEMAP_SOURCE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// HTTP base URL or local directory holding `cases/` and `results/`.
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_true")]
    pub cache_bust: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            cache_bust: default_true(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConfig {
    #[serde(default = "default_ack_delay_ms")]
    pub ack_delay_ms: u64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            ack_delay_ms: default_ack_delay_ms(),
        }
    }
}

impl SaveConfig {
    #[must_use]
    pub const fn ack_delay(&self) -> Duration {
        Duration::from_millis(self.ack_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl SelectionConfig {
    /// Users offered for selection, with the `default` sentinel first and
    /// no duplicates.
    #[must_use]
    pub fn user_choices(&self) -> Vec<String> {
        let mut users = vec![DEFAULT_USER.to_string()];
        for user in &self.users {
            if !users.contains(user) {
                users.push(user.clone());
            }
        }
        users
    }

    /// The version to open when none is given explicitly.
    #[must_use]
    pub fn initial_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.versions.first().map(String::as_str))
    }
}

const fn default_true() -> bool {
    true
}

fn default_location() -> String {
    ".".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_ack_delay_ms() -> u64 {
    u64::try_from(DEFAULT_ACK_DELAY.as_millis()).unwrap_or(1500)
}

/// Read `casemap.toml` from `project_root`, falling back to defaults when it
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the project config and apply overrides: `--source` beats
/// `CASEMAP_SOURCE`, which beats the file.
///
/// # Errors
///
/// Propagates [`load_project_config`] failures.
pub fn resolve_config(project_root: &Path, cli_source: Option<&str>) -> Result<ProjectConfig> {
    let mut config = load_project_config(project_root)?;
    let env_source = env::var(SOURCE_ENV).ok();
    apply_source_override(&mut config, cli_source, env_source.as_deref());
    Ok(config)
}

fn apply_source_override(config: &mut ProjectConfig, cli: Option<&str>, env: Option<&str>) {
    let chosen = cli
        .or(env)
        .map(str::trim)
        .filter(|location| !location.is_empty());
    if let Some(location) = chosen {
        config.source.location = location.to_string();
    }
}
