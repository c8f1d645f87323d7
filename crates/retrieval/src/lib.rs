//! # Manualrag Retrieval
//!
//! Answers questions against the current index generation.
//!
//! ```text
//! question ──> EmbeddingClient ──> FlatIndex::search(k)
//!                                      │
//!                       MetadataStore ─┘──> GroundingPrompt ──> Generator (streamed)
//! ```
//!
//! The index is resolved before configuration is read, so a system that was never
//! indexed reports [`RetrievalError::IndexNotFound`] even without a credential.

mod error;
mod generator;
mod pipeline;
mod prompt;

pub use error::{Result, RetrievalError};
pub use generator::{Generator, OpenAiChatGenerator, DEFAULT_CHAT_MODEL};
pub use pipeline::{RetrievalPipeline, DEFAULT_TOP_K};
pub use prompt::{build_prompt, GroundingPrompt, RetrievedFragment, CONTEXT_HEADING, QUESTION_LABEL};
