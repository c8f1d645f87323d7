//! # Manualrag Text Chunker
//!
//! Sentence-aware chunking of extracted manual text into overlapping fragments.
//!
//! ## Algorithm
//!
//! ```text
//! Raw text
//!     │
//!     ├──> Sentence split (whitespace after `.`, `?`, `!`)
//!     │
//!     ├──> Accumulate sentences into a buffer
//!     │    └─> buffer + sentence > chunk_size  →  emit buffer,
//!     │                                           seed with its last chunk_overlap chars
//!     │
//!     └──> Emit the remaining buffer
//! ```
//!
//! The overlap is a raw character tail of the previous buffer, so a chunk may start in the
//! middle of a sentence. Sentences are never split: a single sentence longer than
//! `chunk_size` becomes an oversized chunk.
//!
//! ## Example
//!
//! ```rust
//! use manualrag_text_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//! let chunks = chunker.chunk("Open the valve. Wait ten seconds! Is the light green?");
//! assert_eq!(chunks, vec!["Open the valve. Wait ten seconds! Is the light green?"]);
//! ```

mod chunker;
mod config;
mod error;

pub use chunker::{split_sentences, Chunker};
pub use config::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use error::{ChunkerError, Result};
