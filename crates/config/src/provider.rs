use crate::config::Config;
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Source of the persisted configuration.
///
/// Implementations must not cache: every `load` observes the latest saved state.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn load(&self) -> Result<Config>;

    async fn save(&self, config: &Config) -> Result<()>;
}

/// JSON file backed configuration.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> Result<Config> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "Config file {} not found; using defaults",
                    self.path.display()
                );
                return Ok(Config::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::info!("Saved configuration to {}", self.path.display());
        Ok(())
    }
}

/// In-memory configuration, for tests and embedding in other processes.
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: Mutex<Config>,
}

impl MemoryConfigProvider {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn load(&self) -> Result<Config> {
        self.config
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| ConfigError::Other("config lock poisoned".to_string()))
    }

    async fn save(&self, config: &Config) -> Result<()> {
        let mut guard = self
            .config
            .lock()
            .map_err(|_| ConfigError::Other("config lock poisoned".to_string()))?;
        *guard = config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let tmp = TempDir::new().unwrap();
        let provider = FileConfigProvider::new(tmp.path().join("config.json"));
        assert_eq!(provider.load().await.unwrap(), Config::default());
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let provider = FileConfigProvider::new(tmp.path().join("nested").join("config.json"));
        let config = Config {
            embedding_service_credential: "sk-123".to_string(),
            system_context: "Answer in English.".to_string(),
            manuals: vec!["pump.pdf".to_string()],
        };
        provider.save(&config).await.unwrap();
        assert_eq!(provider.load().await.unwrap(), config);
        assert!(!tmp.path().join("nested").join("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn external_edits_are_visible_on_next_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let provider = FileConfigProvider::new(&path);
        provider.save(&Config::default()).await.unwrap();

        tokio::fs::write(&path, r#"{"openai_key":"edited","context":"new context"}"#)
            .await
            .unwrap();

        let config = provider.load().await.unwrap();
        assert_eq!(config.credential().unwrap(), "edited");
        assert_eq!(config.system_context, "new context");
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let err = FileConfigProvider::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ConfigError::SerializationError(_)));
    }

    #[tokio::test]
    async fn memory_provider_roundtrip() {
        let provider = MemoryConfigProvider::default();
        let config = Config {
            system_context: "ctx".to_string(),
            ..Config::default()
        };
        provider.save(&config).await.unwrap();
        assert_eq!(provider.load().await.unwrap(), config);
    }
}
