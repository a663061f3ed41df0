//! Error taxonomy for the retrieval pipeline.

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Errors surfaced by the ingestion and query pipeline.
///
/// Configuration gaps (`EmbeddingUnavailable`) are reported to the caller so
/// the service can degrade instead of crashing; `DimensionMismatch` is fatal
/// for the offending add but never corrupts the index; backend failures keep
/// their cause and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// No embedding backend was configured; ingestion cannot proceed
    #[error("No embedding backend is configured")]
    EmbeddingUnavailable,

    /// A vector's dimension differs from the one the index was built with
    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Nothing to ingest (no texts supplied)
    #[error("No readable text to ingest")]
    EmptyInput,

    /// An embedding or generation backend call failed
    #[error("Backend failure: {source}")]
    Backend {
        #[source]
        source: anyhow::Error,
    },

    /// Writing the index or document store to disk failed
    #[error("Persistence failed: {source}")]
    Persistence {
        #[source]
        source: anyhow::Error,
    },

    /// IO errors while reading persisted state
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The persisted index file is malformed
    #[error("Corrupt index file: {message}")]
    CorruptIndex { message: String },

    /// The persisted index and document store disagree about corpus size
    #[error(
        "Index and document store are out of sync: {index_len} vectors vs {store_len} documents"
    )]
    StoreDesync { index_len: usize, store_len: usize },
}

impl RetrieverError {
    /// Wrap a backend error with its cause preserved.
    pub fn backend<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: source.into(),
        }
    }

    /// Wrap a persistence error with its cause preserved.
    pub fn persistence<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence {
            source: source.into(),
        }
    }

    /// Create a corrupt-index error with a custom message.
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::CorruptIndex {
            message: message.into(),
        }
    }
}
