use crate::error::{Result, VectorStoreError};
use crate::paths::replace_file;
use crate::types::SearchHit;
use ndarray::{Array2, ArrayView1};
use std::path::Path;

const MAGIC: &[u8; 8] = b"MRAGFLAT";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 8;

/// Exact (brute-force) L2 index over fixed-dimension vectors.
///
/// Vector `i` corresponds to metadata position `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Array2<f32>,
}

impl FlatIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Array2::zeros((0, dimension)),
        }
    }

    /// Build an index from vectors in position order.
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            flat.extend_from_slice(vector);
        }
        Self::from_flat(dimension, vectors.len(), flat)
    }

    fn from_flat(dimension: usize, count: usize, flat: Vec<f32>) -> Result<Self> {
        let vectors = Array2::from_shape_vec((count, dimension), flat)
            .map_err(|e| VectorStoreError::CorruptIndex(e.to_string()))?;
        Ok(Self { dimension, vectors })
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` nearest vectors by squared L2 distance, closest first.
    ///
    /// Equal distances are ordered by position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }

        let query = ArrayView1::from(query);
        let mut hits: Vec<SearchHit> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(position, row)| {
                let distance = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                SearchHit { position, distance }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Little-endian: magic, version (u32), dimension (u32), count (u64), then the floats.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.vectors {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
            return Err(VectorStoreError::CorruptIndex(
                "missing index header".to_string(),
            ));
        }
        let version = u32::from_le_bytes(read_array(&bytes[8..12]));
        if version != FORMAT_VERSION {
            return Err(VectorStoreError::CorruptIndex(format!(
                "unsupported index format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let dimension = u32::from_le_bytes(read_array(&bytes[12..16])) as usize;
        let count = usize::try_from(u64::from_le_bytes(read_array(&bytes[16..24])))
            .map_err(|_| VectorStoreError::CorruptIndex("vector count overflow".to_string()))?;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| VectorStoreError::CorruptIndex("vector count overflow".to_string()))?;
        if body.len() != expected {
            return Err(VectorStoreError::CorruptIndex(format!(
                "expected {expected} bytes of vectors, found {}",
                body.len()
            )));
        }

        let flat = body
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(read_array(chunk)))
            .collect();
        Self::from_flat(dimension, count, flat)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("bin.tmp");
        replace_file(&tmp, &path, &self.encode()).await?;
        log::debug!("Saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(VectorStoreError::IndexNotFound(path.display().to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        Self::decode(&bytes)
    }
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&slice[..N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> FlatIndex {
        FlatIndex::build(
            2,
            &[vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, 5.0]],
        )
        .unwrap()
    }

    #[test]
    fn exact_match_ranks_first() {
        let hits = sample().search(&[1.0, 1.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 1);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].position, 0);
        assert_eq!(hits[1].distance, 2.0);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let hits = sample().search(&[4.0, 4.0], 10).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![2, 1, 0]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn ties_are_broken_by_position() {
        let index = FlatIndex::build(1, &[vec![2.0], vec![0.0], vec![2.0]]).unwrap();
        let hits = index.search(&[1.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn empty_index_and_zero_k_return_nothing() {
        assert!(FlatIndex::new(3).search(&[0.0; 3], 5).unwrap().is_empty());
        assert!(sample().search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        assert!(matches!(
            sample().search(&[1.0], 1),
            Err(VectorStoreError::InvalidDimension {
                expected: 2,
                actual: 1
            })
        ));
        assert!(FlatIndex::build(2, &[vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(matches!(
            FlatIndex::decode(b"not an index"),
            Err(VectorStoreError::CorruptIndex(_))
        ));

        let mut truncated = sample().encode();
        truncated.pop();
        assert!(matches!(
            FlatIndex::decode(&truncated),
            Err(VectorStoreError::CorruptIndex(_))
        ));

        let mut wrong_version = sample().encode();
        wrong_version[8] = 9;
        assert!(FlatIndex::decode(&wrong_version).is_err());
    }

    #[tokio::test]
    async fn save_and_load_preserve_search_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("index.bin");
        let index = sample();
        index.save(&path).await.unwrap();

        let loaded = FlatIndex::load(&path).await.unwrap();
        assert_eq!(loaded, index);
        assert_eq!(
            loaded.search(&[0.2, 0.1], 3).unwrap(),
            index.search(&[0.2, 0.1], 3).unwrap()
        );
        assert!(!path.with_extension("bin.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_index_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FlatIndex::load(dir.path().join("index.bin")).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::IndexNotFound(_)));
    }
}
