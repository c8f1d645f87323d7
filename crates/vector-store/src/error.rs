use manualrag_config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// A single call to the embedding service failed.
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// The embedding client gave up.
    #[error("Embedding failed after {attempts} attempt(s): {message}")]
    EmbeddingFailure { attempts: usize, message: String },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Index and metadata are misaligned: {vectors} vectors, {ids} ids, {texts} texts")]
    Misaligned {
        vectors: usize,
        ids: usize,
        texts: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
