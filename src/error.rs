use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the doclens application
#[derive(Error, Debug)]
pub enum DoclensError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Required credential absent from the environment
    #[error("Required credential is not set: {var}")]
    ConfigurationMissing { var: String },

    /// Document path does not exist
    #[error("Document not found: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    /// File extension not recognized by the loader
    #[error("Unsupported file type: {extension}. Use PDF, TXT, or Markdown")]
    UnsupportedFileType { extension: String },

    /// PDF parsing errors
    #[error("Failed to parse PDF {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Embedding backend errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    /// Chunk store errors
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Language model backend errors
    #[error("Language model error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for doclens operations
pub type Result<T> = std::result::Result<T, DoclensError>;
