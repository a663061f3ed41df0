//! Ordered storage for ingested chunk texts.
//!
//! The document store is the positional twin of the vector index: the text
//! at position `i` is the chunk whose embedding sits at index position `i`.
//! The two grow in lockstep and are never reordered or truncated
//! independently; search results map back to text by position alone.
//!
//! Persistence is a newline-delimited text file (`docs.txt`). Embedded
//! newlines in a chunk are replaced with spaces on save, which is lossy but
//! keeps the file trivially inspectable; chunk boundaries never contain
//! information the retrieval pipeline depends on.

use crate::error::{Result, RetrieverError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Ordered sequence of chunk texts, insertion order = ingestion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    texts: Vec<String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunk texts.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Append chunk texts in order.
    pub fn append<I>(&mut self, texts: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.texts.extend(texts);
    }

    /// Get the chunk text at `position`, if it exists.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(|s| s.as_str())
    }

    /// Iterate over all stored texts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.texts.iter().map(|s| s.as_str())
    }

    /// Write the store to `path` atomically, one chunk per line.
    ///
    /// Embedded line breaks are flattened to spaces so positions survive the
    /// round trip.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(parent).map_err(RetrieverError::persistence)?;

        for text in &self.texts {
            let flattened = text.replace(['\n', '\r'], " ");
            file.write_all(flattened.as_bytes())
                .map_err(RetrieverError::persistence)?;
            file.write_all(b"\n").map_err(RetrieverError::persistence)?;
        }

        file.persist(path)
            .map_err(|e| RetrieverError::persistence(e.error))?;
        tracing::debug!(
            "Saved {} documents to {}",
            self.texts.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a store previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let texts: Vec<String> = content.lines().map(|line| line.to_string()).collect();
        Ok(Self { texts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_get() {
        let mut store = DocumentStore::new();
        assert!(store.is_empty());

        store.append(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0), Some("first"));
        assert_eq!(store.get(1), Some("second"));
        assert_eq!(store.get(2), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("docs.txt");

        let mut store = DocumentStore::new();
        store.append(vec![
            "The sky is blue.".to_string(),
            "Grass is green.".to_string(),
        ]);
        store.save(&path).unwrap();

        let loaded = DocumentStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_embedded_newlines_flatten_to_spaces() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("docs.txt");

        let mut store = DocumentStore::new();
        store.append(vec!["line one\nline two\r\nline three".to_string()]);
        store.save(&path).unwrap();

        let loaded = DocumentStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(0), Some("line one line two  line three"));
    }

    #[test]
    fn test_empty_store_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("docs.txt");

        DocumentStore::new().save(&path).unwrap();
        let loaded = DocumentStore::load(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing.txt");
        assert!(DocumentStore::load(&path).is_err());
    }
}
