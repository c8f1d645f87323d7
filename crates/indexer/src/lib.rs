//! # Manualrag Indexer
//!
//! Full rebuild of the manual index.
//!
//! ## Pipeline
//!
//! ```text
//! Manuals folder
//!     │
//!     ├──> DocumentScanner (top level, sorted)
//!     │      └─> TextExtractor → plain text
//!     │
//!     ├──> Chunker (sentence-aware, character overlap)
//!     │      └─> Fragments
//!     │
//!     ├──> embed_all (BATCH_SIZE per request, MAX_WORKERS in flight)
//!     │      └─> vectors aligned with fragments
//!     │
//!     └──> FlatIndex + MetadataStore
//!            └─> new generation, CURRENT swapped
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use manualrag_config::FileConfigProvider;
//! use manualrag_indexer::{IndexerSettings, ManualIndexer};
//! use manualrag_vector_store::DefaultEmbeddingConnector;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let indexer = ManualIndexer::new(
//!         ".manualrag",
//!         Arc::new(FileConfigProvider::new("config.json")),
//!         Arc::new(DefaultEmbeddingConnector::from_env()?),
//!         IndexerSettings::from_env(),
//!     )?;
//!     let stats = indexer.build("manuals".as_ref()).await?;
//!
//!     println!("Indexed {} documents, {} fragments", stats.documents, stats.fragments);
//!     Ok(())
//! }
//! ```

mod batch;
mod error;
mod extract;
mod index_lock;
mod indexer;
mod limits;
mod scanner;
mod stats;

pub use batch::embed_all;
pub use error::{IndexerError, Result};
pub use extract::{ExtractedText, PlainTextExtractor, TextExtractor};
pub use indexer::{IndexerSettings, ManualIndexer};
pub use limits::{BatchLimits, DEFAULT_BATCH_SIZE, DEFAULT_MAX_WORKERS};
pub use scanner::DocumentScanner;
pub use stats::IndexStats;
