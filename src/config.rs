use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that selects the store backend (`memory` or `sqlite`).
pub const ENV_BACKEND: &str = "KITCHEN_MEMORIES_BACKEND";
/// Environment variable holding the SQLite path. Setting it also selects the sqlite backend.
pub const ENV_DB: &str = "KITCHEN_MEMORIES_DB";
pub const ENV_LOG_LEVEL: &str = "KITCHEN_MEMORIES_LOG_LEVEL";
pub const ENV_PORT: &str = "KITCHEN_MEMORIES_PORT";
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KitchenConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Upper bound on request bodies; photos arrive base64-encoded inside JSON.
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory` (lost on restart) or `sqlite`.
    pub backend: String,
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `gemini` or `mock`.
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub vision_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
    /// Minimum 0-100 confidence for the remember flow to accept a match.
    pub match_threshold: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            log_level: "info".into(),
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_data_dir()
            .join("memories.db")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: "memory".into(),
            db_path,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            text_model: "gemini-3-flash-preview".into(),
            vision_model: "gemini-3-flash-preview".into(),
            image_model: "gemini-3-pro-image-preview".into(),
            timeout_secs: 120,
            match_threshold: 70.0,
        }
    }
}

/// Returns `~/.kitchen-memories/`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kitchen-memories")
}

/// Returns the default config file path: `~/.kitchen-memories/config.toml`
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

impl KitchenConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KitchenConfig::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(ENV_DB) {
            self.storage.db_path = val;
            self.storage.backend = "sqlite".into();
        }
        if let Some(val) = lookup(ENV_BACKEND) {
            self.storage.backend = val;
        }
        if let Some(val) = lookup(ENV_LOG_LEVEL) {
            self.server.log_level = val;
        }
        if let Some(val) = lookup(ENV_PORT) {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid {ENV_PORT}"),
            }
        }
        if let Some(val) = lookup(ENV_API_KEY) {
            self.generation.api_key = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
