use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Default maximum chunk length, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Default overlap carried from one chunk into the next, in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 400;

/// Configuration for text chunking behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Soft upper bound on chunk length in characters.
    ///
    /// Only checked between sentences, so a single long sentence can exceed it.
    pub chunk_size: usize,

    /// Number of trailing characters of an emitted chunk that seed the next one
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }
}
