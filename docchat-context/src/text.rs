//! Overlapping-window text chunking for retrieval.
//!
//! Documents are split into consecutive windows of a fixed number of
//! characters, where each window shares its first `overlap` characters with
//! the tail of the previous one. The overlap keeps sentences that straddle a
//! window boundary retrievable from both sides.
//!
//! Window offsets advance by `chunk_size - overlap` characters, so a
//! configuration with `overlap >= chunk_size` would never make progress.
//! [`ChunkConfig::new`] rejects such configurations up front instead of
//! silently disabling the overlap.
//!
//! All sizes are measured in characters, not bytes, so multi-byte UTF-8
//! content is never split mid-character.
//!
//! ```
//! use docchat_context::text::{ChunkConfig, Chunker};
//!
//! let config = ChunkConfig::new(10, 3).unwrap();
//! let chunker = Chunker::new(config);
//!
//! let chunks = chunker.chunk("The quick brown fox jumps over the lazy dog");
//! assert!(chunks.iter().all(|c| c.chars().count() <= 10));
//!
//! // Consecutive chunks share exactly `overlap` characters.
//! let first_tail: String = chunks[0].chars().skip(10 - 3).collect();
//! let second_head: String = chunks[1].chars().take(3).collect();
//! assert_eq!(first_tail, second_head);
//! ```

use serde::Serialize;
use thiserror::Error;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// Errors raised when constructing an invalid [`ChunkConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkConfigError {
    /// Chunk size of zero would produce no windows at all.
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    /// Overlap must leave a positive advance step between windows.
    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Validated chunking parameters.
///
/// Invariants enforced at construction: `chunk_size > 0` and
/// `overlap < chunk_size`, so the advance step `chunk_size - overlap` is
/// always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Create a config, rejecting degenerate combinations.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if chunk_size == 0 {
            return Err(ChunkConfigError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive windows in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Characters each window start advances past the previous one.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// A single window of a source document, with its position metadata.
///
/// Produced by [`Chunker::chunk_indexed`]; most callers only need the plain
/// strings from [`Chunker::chunk`].
#[derive(Debug, Clone, Serialize)]
pub struct TextChunk {
    /// 0-indexed order of this chunk within its source document.
    pub sequence: usize,
    /// Character offset of the window start within the source document.
    pub char_start: usize,
    /// The window's text.
    pub text: String,
}

/// Splits text into overlapping fixed-size character windows.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split `text` into overlapping windows.
    ///
    /// Empty input yields an empty vector; callers ingesting documents fall
    /// back to treating the whole text as a single chunk so a document is
    /// never silently dropped. Once a window reaches the end of the text no
    /// further windows are emitted, so the final window may be shorter than
    /// `chunk_size` but a trailing overlap-only fragment is never produced.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.chunk_indexed(text)
            .into_iter()
            .map(|c| c.text)
            .collect()
    }

    /// Split `text` into windows, keeping sequence numbers and offsets.
    pub fn chunk_indexed(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, so windows slice on boundaries.
        let boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let total_chars = boundaries.len();
        let step = self.config.step();

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.config.chunk_size).min(total_chars);
            let byte_start = boundaries[start];
            let byte_end = if end == total_chars {
                text.len()
            } else {
                boundaries[end]
            };
            chunks.push(TextChunk {
                sequence: chunks.len(),
                char_start: start,
                text: text[byte_start..byte_end].to_string(),
            });
            if end == total_chars {
                break;
            }
            start += step;
        }
        chunks
    }
}
