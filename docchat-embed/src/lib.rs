//! # docchat-embed
//!
//! Text embedding for the docchat retrieval pipeline, built on local ONNX
//! models via FastEmbed. The crate exposes a provider trait so the rest of
//! the system never depends on a concrete backend: the service runs in a
//! degraded, retrieval-free mode when no provider is configured.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docchat_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//!
//! let texts = vec!["The sky is blue.".to_string(), "Grass is green.".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//! println!("{} embeddings of dimension {}", result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: model configuration and file layout
//! - [`provider`]: the [`EmbeddingProvider`] trait and FastEmbed implementation
//! - [`downloader`]: HuggingFace model downloading for user-defined models
//! - [`error`]: error types and result handling
//!
//! The default model is the fastembed built-in all-MiniLM-L6-v2 (384-dim).
//! Models are cached globally so multiple providers with the same
//! configuration share one loaded instance.

pub mod config;
pub mod downloader;
pub mod error;
pub mod provider;

pub use config::{DEFAULT_MODEL_NAME, EmbedConfig};
pub use downloader::ModelDownloader;
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
