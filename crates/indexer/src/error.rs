use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// Input rejected before any embedding work (unsupported file, empty corpus)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] manualrag_text_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] manualrag_vector_store::VectorStoreError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] manualrag_config::ConfigError),

    #[error("Invalid manuals path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}
