//! Error types for the embedding system

use std::path::PathBuf;

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type covering embedding model configuration, loading, and runtime
/// failures. Integrates with [`thiserror`] for error chaining so callers see
/// the underlying cause of a failed load or a failed batch.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// A required model or tokenizer file is missing on disk
    #[error("Model file not found: {path}")]
    ModelFileNotFound { path: PathBuf },

    /// The model configuration is invalid or incomplete
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
