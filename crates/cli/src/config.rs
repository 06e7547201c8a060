use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `ai.endpoint` when set.
pub const AI_ENDPOINT_ENV: &str = "CAIXA_AI_ENDPOINT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    /// TOML rule table replacing the built-in one.
    pub rules_path: Option<PathBuf>,
    /// Keep hand-edited categories when AI results are merged.
    pub protect_manual_edits: bool,
    /// Ignore AI proposals that are not in the item's category list.
    pub restrict_ai_to_catalogue: bool,
    pub ai: AiSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSection {
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: "CAIXA_AI_KEY".to_string(),
            model: None,
            timeout_secs: 30,
        }
    }
}

impl AiSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("br", "caixa", "Caixa")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("caixa.toml"))
}

impl Config {
    /// Explicit database path, else `<data dir>/caixa.db`, else `./caixa.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|d| d.data_dir().join("caixa.db"))
                .unwrap_or_else(|| PathBuf::from("caixa.db"))
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse caixa.toml")
    }

    fn apply_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(AI_ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.ai.endpoint = Some(endpoint);
            }
        }
        self
    }
}

/// An explicit path must exist; the default location may be absent, in which
/// case defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => read_config(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config(&path)?,
            _ => Config::default(),
        },
    };
    Ok(config.apply_env())
}

fn read_config(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Config::from_toml(&content).with_context(|| format!("in {}", path.display()))
}
