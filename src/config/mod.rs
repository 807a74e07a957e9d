//! Configuration management for doclens
//!
//! Loading, validation, and defaults for the TOML configuration file. The
//! credential named by `llm.api_key_env` is resolved at client construction,
//! before any pipeline work starts.

use crate::error::{DoclensError, Result};
use crate::ingest::ChunkingConfig;
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Chunking parameters, validated into a `ChunkingConfig` before use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub overlap: usize,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model: String,
    /// Must match the model's output dimension; the store is opened with it
    pub dimension: usize,
    pub batch_size: usize,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    pub hnsw_ef_construction: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_search: usize,
    pub search_multiplier: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

/// Language-model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DoclensError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DoclensError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DoclensError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Default config file location (~/.config/doclens/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DoclensError::Config("Cannot determine config directory".to_string()))?;
        Ok(config_dir.join("doclens").join("config.toml"))
    }

    /// Database path under the data directory
    pub fn db_path(&self) -> PathBuf {
        self.storage.data_dir.join("chunks.db")
    }

    /// Validated chunking parameters
    pub fn chunking_config(&self) -> Result<ChunkingConfig> {
        ChunkingConfig::new(self.chunking.chunk_size, self.chunking.overlap)
    }

    /// Store parameters derived from the embedding and index sections
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dimension: self.embedding.dimension,
            hnsw_ef_construction: self.index.hnsw_ef_construction,
            hnsw_m: self.index.hnsw_m,
            hnsw_ef_search: self.index.hnsw_ef_search,
            search_multiplier: self.index.search_multiplier,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.local/share/doclens"),
            },
            chunking: ChunkingSettings {
                chunk_size: 500,
                overlap: 50,
            },
            embedding: EmbeddingSettings {
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            index: IndexSettings {
                hnsw_ef_construction: 200,
                hnsw_m: 16,
                hnsw_ef_search: 100,
                search_multiplier: 4,
            },
            retrieval: RetrievalSettings { top_k: 5 },
            llm: LlmConfig {
                provider: "openai".to_string(),
                endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                temperature: 0.1,
                max_tokens: 1024,
                timeout_secs: 30,
                max_retries: 3,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.chunking.chunk_size, config.chunking.chunk_size);
        assert_eq!(loaded.embedding.model, config.embedding.model);
        assert_eq!(loaded.llm.api_key_env, config.llm.api_key_env);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(DoclensError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_chunking_config_validated() {
        let mut config = Config::default();
        config.chunking.overlap = 400;
        assert!(config.chunking_config().is_err());
    }
}
