use crate::config::ChunkerConfig;
use crate::error::Result;
use regex::Regex;
use std::sync::OnceLock;

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.?!]\s+").expect("sentence boundary regex is valid"))
}

/// Split text into trimmed, non-empty sentences.
///
/// A boundary is a whitespace run that directly follows `.`, `?` or `!`; the punctuation
/// stays with the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary().find_iter(text) {
        // Punctuation is a single ASCII byte.
        let end = boundary.start() + 1;
        sentences.push(&text[start..end]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Last `n` characters of `s`, cut on a character boundary.
fn char_tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// Main chunker interface for manual text
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Chunk text into an ordered sequence of overlapping fragments.
    ///
    /// Lengths are measured in characters. The overflow check only runs between sentences,
    /// so chunks holding one oversized sentence (or an overlap tail plus a long sentence)
    /// can exceed `chunk_size`; they are emitted whole.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let ChunkerConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0usize;

        for sentence in split_sentences(text) {
            let sentence_chars = sentence.chars().count();
            if buffer_chars + sentence_chars > chunk_size {
                let finished = buffer.trim();
                if !finished.is_empty() {
                    chunks.push(finished.to_string());
                }
                buffer = char_tail(&buffer, chunk_overlap).to_string();
                buffer_chars = buffer_chars.min(chunk_overlap);
            }
            buffer.push_str(sentence);
            buffer.push(' ');
            buffer_chars += sentence_chars + 1;
        }

        let finished = buffer.trim();
        if !finished.is_empty() {
            chunks.push(finished.to_string());
        }

        log::debug!(
            "Chunked {} chars into {} chunks",
            text.chars().count(),
            chunks.len()
        );
        chunks
    }
}
