use serde::{Deserialize, Serialize};

/// Statistics about a build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents that produced text
    pub documents: usize,

    /// Fragments embedded and indexed
    pub fragments: usize,

    /// Embedding requests issued (one per batch)
    pub batches: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Documents indexed, in build order
    pub sources: Vec<String>,

    /// Generation made current by this build
    pub generation: Option<String>,

    /// Documents skipped, with the reason
    pub errors: Vec<String>,

    /// Extraction warnings, prefixed with the document name
    pub warnings: Vec<String>,
}

impl IndexStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, fragments: usize) {
        self.documents += 1;
        self.fragments += fragments;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}
