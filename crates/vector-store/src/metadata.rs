use crate::error::{Result, VectorStoreError};
use crate::paths::replace_file;
use crate::types::Fragment;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Fragment ids and texts, positionally aligned with a [`crate::FlatIndex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    ids: Vec<String>,
    texts: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedMetadata {
    schema_version: u32,
    ids: Vec<String>,
    texts: Vec<String>,
}

impl MetadataStore {
    pub fn new(ids: Vec<String>, texts: Vec<String>) -> Result<Self> {
        if ids.len() != texts.len() {
            return Err(VectorStoreError::Misaligned {
                vectors: ids.len(),
                ids: ids.len(),
                texts: texts.len(),
            });
        }
        Ok(Self { ids, texts })
    }

    #[must_use]
    pub fn from_fragments(fragments: &[Fragment]) -> Self {
        let (ids, texts) = fragments
            .iter()
            .map(|f| (f.id.clone(), f.text.clone()))
            .unzip();
        Self { ids, texts }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn id(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    #[must_use]
    pub fn text(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(String::as_str)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(VectorStoreError::IndexNotFound(path.display().to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let persisted: PersistedMetadata = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != METADATA_SCHEMA_VERSION {
            return Err(VectorStoreError::CorruptIndex(format!(
                "Unsupported metadata schema_version {} (expected {METADATA_SCHEMA_VERSION})",
                persisted.schema_version
            )));
        }
        Self::new(persisted.ids, persisted.texts)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedMetadata {
            schema_version: METADATA_SCHEMA_VERSION,
            ids: self.ids.clone(),
            texts: self.texts.clone(),
        };
        let bytes = serde_json::to_vec(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        replace_file(&tmp, &path, &bytes).await?;
        Ok(())
    }
}
