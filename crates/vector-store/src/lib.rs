//! # Manualrag Vector Store
//!
//! Embedding computation and exact nearest-neighbor storage for manual fragments.
//!
//! ## Features
//!
//! - **Embedding client** with per-attempt timeout and exponential backoff
//! - **Flat L2 index** with exact search and a versioned binary format
//! - **Metadata store** positionally aligned with the index
//! - **Index generations** published with an atomic pointer swap
//!
//! ## Architecture
//!
//! ```text
//! Fragment[]
//!     │
//!     ├──> EmbeddingClient (retry + timeout)
//!     │      └─> EmbeddingService (OpenAI / stub)
//!     │             └─> Vector[EMBED_DIM]
//!     │
//!     ├──> FlatIndex (exact L2)      ─┐
//!     │                                ├─> IndexGeneration
//!     └──> MetadataStore {ids, texts} ─┘
//!                                      └─> GenerationStore (CURRENT pointer swap)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use manualrag_vector_store::{FlatIndex, GenerationStore, MetadataStore};
//!
//! #[tokio::main]
//! async fn main() -> manualrag_vector_store::Result<()> {
//!     let index = FlatIndex::build(2, &[vec![0.0, 0.0], vec![1.0, 1.0]])?;
//!     let metadata = MetadataStore::new(
//!         vec!["a".into(), "b".into()],
//!         vec!["first".into(), "second".into()],
//!     )?;
//!
//!     let store = GenerationStore::new(".manualrag");
//!     store.publish(&index, &metadata).await?;
//!
//!     let generation = store.current().await?;
//!     for hit in generation.index().search(&[0.9, 0.9], 1)? {
//!         println!("{}: {}", hit.position, hit.distance);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod generation;
mod metadata;
mod paths;
mod types;

pub use embeddings::{
    DefaultEmbeddingConnector, EmbeddingClient, EmbeddingConnector, EmbeddingMode,
    EmbeddingService, EmbeddingSettings, OpenAiEmbeddingService, RetryPolicy,
    StubEmbeddingService, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBED_DIM,
    DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT,
};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use generation::{GenerationStore, IndexGeneration};
pub use metadata::{MetadataStore, METADATA_SCHEMA_VERSION};
pub use paths::{
    current_pointer_path, generation_dir, generations_dir, index_lock_path, DEFAULT_DATA_DIR,
    INDEX_FILE_NAME, METADATA_FILE_NAME,
};
pub use types::{Fragment, SearchHit};
