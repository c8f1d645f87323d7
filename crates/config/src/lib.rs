//! # Manualrag Config
//!
//! The user-editable configuration shared by index builds and queries: the embedding
//! service credential, the system context prefixed to every prompt, and the list of
//! known manuals.
//!
//! Configuration is never cached. Callers hold a [`ConfigProvider`] and call
//! [`ConfigProvider::load`] at the start of every operation, so an edit made by another
//! process is visible to the next build or query.

mod config;
mod error;
mod provider;

pub use config::Config;
pub use error::{ConfigError, Result};
pub use provider::{ConfigProvider, FileConfigProvider, MemoryConfigProvider, DEFAULT_CONFIG_FILE};
