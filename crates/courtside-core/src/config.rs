use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CourtsideError, Result};

/// Top-level configuration for the Courtside service.
///
/// Loaded from `~/.courtside/config.toml` by default. Every section falls
/// back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourtsideConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub flows: FlowsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl CourtsideConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CourtsideConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CourtsideError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Which data-access collaborator backs the tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    /// In-memory collections seeded with demo data.
    #[default]
    Memory,
    Sqlite,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP API port (bound on 127.0.0.1).
    pub port: u16,
    pub data_source: DataSourceKind,
    /// SQLite database path, used when `data_source = "sqlite"`.
    pub database_path: String,
    /// Requests per second allowed on routes that call the model. 0 disables.
    pub rate_limit_per_sec: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 3040,
            data_source: DataSourceKind::Memory,
            database_path: "~/.courtside/courtside.db".to_string(),
            rate_limit_per_sec: 20,
        }
    }
}

/// Flow orchestration limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowsConfig {
    /// Upper bound on a single backend round-trip.
    pub generation_timeout_secs: u64,
    /// Maximum number of tool-call rounds before the model must answer.
    pub max_tool_rounds: u32,
    /// Review summaries with fewer comments than this skip the model.
    pub min_reviews_for_summary: usize,
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 60,
            max_tool_rounds: 5,
            min_reviews_for_summary: 3,
        }
    }
}

/// Generative backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendProvider {
    #[default]
    Gemini,
    /// Every generation fails; tools and validation still work.
    Disabled,
}

/// Generative backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: BackendProvider,
    pub model: String,
    pub image_model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never written to the config file.
    pub api_key_env: String,
    pub http_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Gemini,
            model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.0-flash-preview-image-generation".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            http_timeout_secs: 90,
        }
    }
}

impl BackendConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
