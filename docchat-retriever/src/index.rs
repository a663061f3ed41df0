//! Append-only flat vector index with exact L2 nearest-neighbor search.
//!
//! Every embedding ever added sits in one contiguous `f32` buffer, row per
//! vector, and search scans the whole buffer. For the corpus sizes this
//! service handles (tens of thousands of chunks) the exhaustive scan is both
//! exact and fast enough; there is no approximate structure to maintain and
//! persistence is a plain memory image.
//!
//! ## Invariants
//!
//! - The first successful [`FlatIndex::add`] fixes the index dimension for
//!   its whole lifetime; later adds with a different dimension fail without
//!   touching the stored data.
//! - Vectors are never reordered or removed, so a vector's position is a
//!   stable identifier the document store is kept aligned with.
//!
//! ## File format
//!
//! `index.bin` is an 8-byte magic, a `u32` format version, the `u32`
//! dimension (0 while uninitialized), a `u64` vector count, then the raw
//! `f32` rows. Integers and floats are little-endian; the file is a
//! byte-exact image of the in-memory index, so save/load round-trips
//! bit-for-bit and a restarted process resumes exactly where it left off.

use crate::error::{Result, RetrieverError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const INDEX_MAGIC: &[u8; 8] = b"DCHATIDX";
const INDEX_FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 8;

/// One nearest-neighbor search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Euclidean (L2) distance between the query and the stored vector
    pub distance: f32,
    /// Insertion position of the stored vector, aligned with the document store
    pub position: usize,
}

/// In-memory flat L2 index over fixed-dimension embedding vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty, uninitialized index. The dimension is established by
    /// the first `add`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors stored.
    pub fn len(&self) -> usize {
        match self.dimension {
            Some(dim) => self.data.len() / dim,
            None => 0,
        }
    }

    /// Returns `true` when no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The established vector dimension, or `None` before the first add.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Append vectors to the index.
    ///
    /// The first successful call establishes the index dimension. Every
    /// vector in the batch is validated before anything is appended, so a
    /// dimension mismatch fails the whole call and leaves the index
    /// unchanged.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let expected = self.dimension.unwrap_or(first.len());
        if expected == 0 {
            return Err(RetrieverError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        for vector in vectors {
            if vector.len() != expected {
                return Err(RetrieverError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        self.dimension = Some(expected);
        self.data.reserve(vectors.len() * expected);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return the `k` nearest vectors to `query` by L2 distance, ascending.
    ///
    /// Ties are broken by insertion order (lowest position first). An index
    /// holding fewer than `k` vectors returns everything it has; an empty or
    /// uninitialized index returns no hits rather than an error. A query of
    /// the wrong dimension is rejected.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(RetrieverError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(position, row)| {
                let squared: f32 = query
                    .iter()
                    .zip(row.iter())
                    .map(|(q, v)| (q - v) * (q - v))
                    .sum();
                SearchHit {
                    distance: squared.sqrt(),
                    position,
                }
            })
            .collect();

        // Stable sort keeps equal distances in insertion order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Write the index to `path` atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(parent).map_err(RetrieverError::persistence)?;

        self.write_to(&mut file)
            .map_err(RetrieverError::persistence)?;

        file.persist(path)
            .map_err(|e| RetrieverError::persistence(e.error))?;
        tracing::debug!(
            "Saved index with {} vectors to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    fn write_to(&self, file: &mut impl Write) -> std::io::Result<()> {
        let dimension = self.dimension.unwrap_or(0) as u32;
        let count = self.len() as u64;

        file.write_all(INDEX_MAGIC)?;
        file.write_all(&INDEX_FORMAT_VERSION.to_le_bytes())?;
        file.write_all(&dimension.to_le_bytes())?;
        file.write_all(&count.to_le_bytes())?;
        file.write_all(bytemuck::cast_slice::<f32, u8>(&self.data))?;
        Ok(())
    }

    /// Load an index previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() < HEADER_LEN {
            return Err(RetrieverError::corrupt("file shorter than header"));
        }

        let (magic, rest) = bytes.split_at(8);
        if magic != INDEX_MAGIC {
            return Err(RetrieverError::corrupt("bad magic"));
        }
        let (version_bytes, rest) = rest.split_at(4);
        let version = u32::from_le_bytes(version_bytes.try_into().unwrap());
        if version != INDEX_FORMAT_VERSION {
            return Err(RetrieverError::corrupt(format!(
                "unsupported format version {version}"
            )));
        }
        let (dimension_bytes, rest) = rest.split_at(4);
        let dimension = u32::from_le_bytes(dimension_bytes.try_into().unwrap()) as usize;
        let (count_bytes, payload) = rest.split_at(8);
        let count = u64::from_le_bytes(count_bytes.try_into().unwrap()) as usize;

        if dimension == 0 {
            if count != 0 || !payload.is_empty() {
                return Err(RetrieverError::corrupt(
                    "dimension 0 with non-empty payload",
                ));
            }
            return Ok(Self::new());
        }

        let expected_bytes = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| RetrieverError::corrupt("vector count overflows"))?;
        if payload.len() != expected_bytes {
            return Err(RetrieverError::corrupt(format!(
                "payload is {} bytes, expected {}",
                payload.len(),
                expected_bytes
            )));
        }

        let data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
        Ok(Self {
            dimension: Some(dimension),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vectors(rows: &[&[f32]]) -> Vec<Vec<f32>> {
        rows.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_first_add_establishes_dimension() {
        let mut index = FlatIndex::new();
        assert_eq!(index.dimension(), None);

        index.add(&vectors(&[&[1.0, 0.0], &[0.0, 1.0]])).unwrap();
        assert_eq!(index.dimension(), Some(2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_leaves_index_unchanged() {
        let mut index = FlatIndex::new();
        index.add(&vectors(&[&[1.0, 0.0]])).unwrap();

        // A batch with one bad vector must not be partially applied
        let result = index.add(&vectors(&[&[2.0, 2.0], &[1.0, 2.0, 3.0]]));
        assert!(matches!(
            result,
            Err(RetrieverError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_add_is_noop() {
        let mut index = FlatIndex::new();
        index.add(&[]).unwrap();
        assert_eq!(index.dimension(), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = FlatIndex::new();
        index
            .add(&vectors(&[&[10.0, 0.0], &[1.0, 0.0], &[5.0, 0.0]]))
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert!(hits[0].distance <= hits[1].distance);
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_ties_break_by_insertion_order() {
        let mut index = FlatIndex::new();
        index
            .add(&vectors(&[&[1.0, 0.0], &[0.0, 1.0], &[-1.0, 0.0]]))
            .unwrap();

        // All three are exactly distance 1 from the origin
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_k_larger_than_len() {
        let mut index = FlatIndex::new();
        index.add(&vectors(&[&[1.0], &[2.0]])).unwrap();

        let hits = index.search(&[0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_empty_index_returns_nothing() {
        let index = FlatIndex::new();
        assert!(index.search(&[1.0, 2.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_rejects_wrong_query_dimension() {
        let mut index = FlatIndex::new();
        index.add(&vectors(&[&[1.0, 2.0]])).unwrap();
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(RetrieverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_save_load_round_trip_is_byte_exact() {
        let temp_dir = tempdir().unwrap();
        let path_a = temp_dir.path().join("index.bin");
        let path_b = temp_dir.path().join("index_b.bin");

        let mut index = FlatIndex::new();
        index
            .add(&vectors(&[&[0.25, -1.5, 3.0], &[1e-7, 42.0, -0.0]]))
            .unwrap();
        index.save(&path_a).unwrap();

        let loaded = FlatIndex::load(&path_a).unwrap();
        assert_eq!(loaded, index);

        // Re-saving the loaded index reproduces the file bit-for-bit
        loaded.save(&path_b).unwrap();
        assert_eq!(fs::read(&path_a).unwrap(), fs::read(&path_b).unwrap());
    }

    #[test]
    fn test_save_load_uninitialized_index() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("index.bin");

        FlatIndex::new().save(&path).unwrap();
        let loaded = FlatIndex::load(&path).unwrap();
        assert_eq!(loaded.dimension(), None);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("index.bin");

        fs::write(&path, b"definitely not an index").unwrap();
        assert!(matches!(
            FlatIndex::load(&path),
            Err(RetrieverError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn test_load_rejects_truncated_payload() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("index.bin");

        let mut index = FlatIndex::new();
        index.add(&vectors(&[&[1.0, 2.0], &[3.0, 4.0]])).unwrap();
        index.save(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(
            FlatIndex::load(&path),
            Err(RetrieverError::CorruptIndex { .. })
        ));
    }
}
