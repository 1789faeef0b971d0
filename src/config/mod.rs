//! Configuration management for docwright
//!
//! Settings live at `<workspace>/.docwright/config.toml`; missing files and
//! missing sections fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::storage::DOCWRIGHT_DIR;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub threads: ThreadsConfig,
}

impl Config {
    /// Load configuration for a workspace, falling back to defaults
    pub fn load(workspace_dir: impl AsRef<Path>) -> Result<Self> {
        let path = workspace_dir
            .as_ref()
            .join(DOCWRIGHT_DIR)
            .join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config.toml")
    }
}

/// Chat backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name used for session creation
    pub name: String,
    /// Chat completions endpoint URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Maximum output tokens per reply
    pub max_tokens: usize,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Thread coordination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsConfig {
    /// Maximum messages kept in a session before oldest-first eviction
    pub history_cap: usize,
    /// File extensions that get a document thread on open
    pub supported_extensions: Vec<String>,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            history_cap: 40,
            supported_extensions: vec![
                "md".to_string(),
                "markdown".to_string(),
                "txt".to_string(),
                "rst".to_string(),
                "adoc".to_string(),
            ],
        }
    }
}
