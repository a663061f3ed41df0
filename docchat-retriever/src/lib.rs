//! docchat-retriever: the ingestion → index → retrieval → prompt pipeline
//!
//! This crate is the core of the docchat RAG service. Raw document texts
//! come in, get chunked and embedded, land in an append-only flat L2 vector
//! index paired position-for-position with a document store, and questions
//! are answered by retrieving the nearest chunks and prompting a generator.
//!
//! ## Key Modules
//!
//! - **[`index`]**: the flat L2 vector index and its byte-exact persistence
//! - **[`store`]**: the positionally aligned chunk-text store
//! - **[`service`]**: the orchestrating [`RetrievalService`] and its lock
//! - **[`error`]**: the pipeline error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docchat_retriever::{RetrievalConfig, RetrievalService};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Backends are injected; None runs the service in degraded mode
//! let service = RetrievalService::open(RetrievalConfig::new("data"), None, None)?;
//!
//! let answer = service.answer("What color is the sky?").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Invariant
//!
//! Index position `i` always corresponds to document store position `i`.
//! The service's single lock keeps the pair in lockstep under concurrent
//! ingests and queries, and persistence writes the index first so a restart
//! never loads more vectors than texts.

pub mod error;
pub mod index;
pub mod service;
pub mod store;

pub use error::{Result, RetrieverError};
pub use index::{FlatIndex, SearchHit};
pub use service::{
    CorpusStats, DOCS_FILE_NAME, INDEX_FILE_NAME, IngestReport, RetrievalConfig, RetrievalService,
    UNCONFIGURED_GENERATOR_ANSWER,
};
pub use store::DocumentStore;
