use serde::{Deserialize, Serialize};

/// A chunk of manual text that is embedded and retrieved as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub text: String,
    /// Position in build order
    pub source_order: usize,
    /// Document the text was extracted from
    pub source: String,
}

impl Fragment {
    /// Create a fragment with a fresh random id
    pub fn new(text: impl Into<String>, source_order: usize, source: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            source_order,
            source: source.into(),
        }
    }
}

/// One nearest-neighbor result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Position in the index (and in the metadata store)
    pub position: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}
