use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Text pulled out of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Non-fatal problems, e.g. replaced invalid UTF-8
    pub warnings: Vec<String>,
}

/// Turns a manual file into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn supports(&self, path: &Path) -> bool;

    async fn extract(&self, path: &Path) -> Result<ExtractedText>;
}

const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "text"];

/// Extractor for plain text and markdown manuals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                PLAIN_TEXT_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
            })
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedText> {
        if !self.supports(path) {
            return Err(IndexerError::Validation(format!(
                "unsupported document type: {}",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let mut warnings = Vec::new();
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                warnings.push("invalid UTF-8 replaced".to_string());
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        Ok(ExtractedText { text, warnings })
    }
}
