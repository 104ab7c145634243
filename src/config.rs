use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HyphaConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Session id used when a caller does not supply one.
    pub default_session: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "ollama" or "disabled".
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    /// Hybrid fusion weight for the keyword score. Defaults: keyword 0.4,
    /// semantic 0.6.
    pub keyword_weight: f64,
    /// Hybrid fusion weight for the semantic score.
    pub semantic_weight: f64,
    /// Default similarity floor for semantic search.
    pub min_similarity: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// How many recent memories to consider when pairing candidates.
    pub candidate_limit: usize,
    /// Default similarity floor for auto-generated edges.
    pub min_strength: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 3459,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_hypha_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_session: "default".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            dimension: 768,
            timeout_secs: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            keyword_weight: 0.4,
            semantic_weight: 0.6,
            min_similarity: 0.3,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 50,
            min_strength: 0.7,
        }
    }
}

/// Returns `~/.hypha/`
pub fn default_hypha_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".hypha")
}

/// Returns the default config file path: `~/.hypha/config.toml`
pub fn default_config_path() -> PathBuf {
    default_hypha_dir().join("config.toml")
}

impl HyphaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
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
            HyphaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (HYPHA_DB, HYPHA_LOG_LEVEL,
    /// HYPHA_OLLAMA_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HYPHA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HYPHA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("HYPHA_OLLAMA_URL") {
            self.embedding.base_url = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
