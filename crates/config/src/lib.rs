//! Configuration loading, validation, and management for Labeler.
//!
//! Loads configuration from `~/.labeler/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.labeler/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the domain catalog comes from
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Where classification results are persisted
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Session behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// State server (`labeler serve`)
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// File path or `http(s)://` URL of a newline-delimited domain list
    #[serde(default = "default_catalog_source")]
    pub source: String,
}

fn default_catalog_source() -> String {
    "assets/domains.txt".into()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_catalog_source(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// "file", "http", "memory" or "none"
    #[serde(default = "default_persistence_backend")]
    pub backend: String,

    /// State file for the "file" backend (defaults to `~/.labeler/state.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Endpoint for the "http" backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout for the "http" backend
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_persistence_backend() -> String {
    "file".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_persistence_backend(),
            path: None,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// "phone" (a `0` followed by 10 digits) or "any"
    #[serde(default = "default_identity_rule")]
    pub identity_rule: String,

    /// Categories offered before any are persisted
    #[serde(default = "default_categories")]
    pub default_categories: Vec<String>,

    /// Fixed shuffle seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_identity_rule() -> String {
    "phone".into()
}
fn default_categories() -> Vec<String> {
    [
        "news",
        "shopping",
        "social",
        "entertainment",
        "education",
        "technology",
        "government",
        "other",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity_rule: default_identity_rule(),
            default_categories: default_categories(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    48620
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.labeler/config.toml).
    ///
    /// Environment variables override the file:
    /// - `LABELER_CATALOG`
    /// - `LABELER_PERSISTENCE_BACKEND`
    /// - `LABELER_PERSISTENCE_URL` (also selects the "http" backend)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(source) = std::env::var("LABELER_CATALOG") {
            self.catalog.source = source;
        }

        if let Ok(url) = std::env::var("LABELER_PERSISTENCE_URL") {
            self.persistence.endpoint = Some(url);
            self.persistence.backend = "http".into();
        }

        // An explicit backend wins over the one implied by the URL
        if let Ok(backend) = std::env::var("LABELER_PERSISTENCE_BACKEND") {
            self.persistence.backend = backend;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".labeler")
    }

    /// Resolved state file for the "file" backend.
    pub fn state_path(&self) -> PathBuf {
        self.persistence
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("state.json"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.persistence.backend.as_str() {
            "file" | "memory" | "none" => {}
            "http" => {
                let endpoint = self.persistence.endpoint.as_deref().unwrap_or_default();
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(ConfigError::ValidationError(
                        "persistence.endpoint must be an http(s) URL when backend = \"http\"".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown persistence backend {other:?} (expected file, http, memory or none)"
                )));
            }
        }

        if !matches!(self.session.identity_rule.as_str(), "phone" | "any") {
            return Err(ConfigError::ValidationError(format!(
                "unknown session.identity_rule {:?} (expected phone or any)",
                self.session.identity_rule
            )));
        }

        if self.persistence.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "persistence.timeout_secs must be > 0".into(),
            ));
        }

        if self.catalog.source.trim().is_empty() {
            return Err(ConfigError::ValidationError("catalog.source must not be empty".into()));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
