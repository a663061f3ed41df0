//! Text chunking for the docchat retrieval pipeline.
//!
//! Uploaded documents are split into overlapping fixed-size character
//! windows before being embedded; the window text is the retrieval unit the
//! rest of the system stores and searches. See [`text`] for the chunking
//! contract and its edge cases.

pub mod text;

pub use text::{Chunker, ChunkConfig, ChunkConfigError, TextChunk};
pub use text::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
