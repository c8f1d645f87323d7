use anyhow::{Context, Result};
use manualrag_config::Config;
use manualrag_retrieval::RetrievedFragment;
use serde::Serialize;

#[derive(Serialize)]
pub struct ConfigView<'a> {
    pub credential: String,
    pub context: &'a str,
    pub manuals: &'a [String],
}

impl<'a> ConfigView<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            credential: redact(&config.embedding_service_credential),
            context: &config.system_context,
            manuals: &config.manuals,
        }
    }
}

#[derive(Serialize)]
pub struct StatusOutput {
    pub indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    pub fragments: usize,
    pub dimension: usize,
}

#[derive(Serialize)]
pub struct AnswerOutput<'a> {
    pub question: &'a str,
    pub answer: String,
    pub fragments: &'a [RetrievedFragment],
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Keep only the last four characters of a secret.
pub fn redact(secret: &str) -> String {
    let secret = secret.trim();
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
