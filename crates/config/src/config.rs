use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Persisted configuration.
///
/// Field names on disk follow the historical `config.json` layout (`openai_key`,
/// `context`, `manuals`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Credential for the remote embedding and generation services
    #[serde(rename = "openai_key", default)]
    pub embedding_service_credential: String,

    /// Free-text context placed at the top of every grounding prompt
    #[serde(rename = "context", default)]
    pub system_context: String,

    /// File names of the manuals the user uploaded
    #[serde(default)]
    pub manuals: Vec<String>,
}

impl Config {
    /// Trimmed credential, or [`ConfigError::MissingCredential`] when blank.
    pub fn credential(&self) -> Result<&str> {
        let key = self.embedding_service_credential.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(key)
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.embedding_service_credential.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_historical_layout() {
        let raw = r#"{"openai_key":" sk-test ","context":"You are a support bot.","manuals":["a.pdf"]}"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.credential().unwrap(), "sk-test");
        assert_eq!(config.system_context, "You are a support bot.");
        assert_eq!(config.manuals, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(matches!(
            config.credential(),
            Err(ConfigError::MissingCredential)
        ));
    }

    #[test]
    fn blank_credential_is_missing() {
        let config = Config {
            embedding_service_credential: "   ".to_string(),
            ..Config::default()
        };
        assert!(!config.has_credential());
        assert!(config.credential().is_err());
    }
}
