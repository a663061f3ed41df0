//! Error types for answer generation

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Error type for answer generation and model-file fetching.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The completion server could not be reached or the request failed
    #[error("Completion request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The completion server answered with a non-success status
    #[error("Completion server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The completion server's response body was not in the expected shape
    #[error("Unexpected completion response: {message}")]
    InvalidResponse { message: String },

    /// IO errors while writing a fetched model file
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GenerateError {
    /// Create an invalid-response error with a custom message.
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
