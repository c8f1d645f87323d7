use manualrag_config::ConfigError;
use manualrag_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Index not found ({0}); run `manualrag index` first")]
    IndexNotFound(String),

    #[error("Embedding failed after {attempts} attempt(s): {message}")]
    EmbeddingFailure { attempts: usize, message: String },

    #[error("Query dimension {actual} does not match index dimension {expected}; reindex")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(VectorStoreError),
}

impl From<VectorStoreError> for RetrievalError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::IndexNotFound(what) => Self::IndexNotFound(what),
            VectorStoreError::EmbeddingFailure { attempts, message } => {
                Self::EmbeddingFailure { attempts, message }
            }
            VectorStoreError::EmbeddingError(message) => Self::EmbeddingFailure {
                attempts: 1,
                message,
            },
            VectorStoreError::InvalidDimension { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorStoreError::ConfigError(err) => Self::ConfigError(err),
            other => Self::VectorStoreError(other),
        }
    }
}
