use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::metadata::MetadataStore;
use crate::paths::{
    current_pointer_path, generation_dir, generations_dir, replace_file, INDEX_FILE_NAME,
    METADATA_FILE_NAME,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// An index and its metadata, published together.
#[derive(Debug)]
pub struct IndexGeneration {
    id: String,
    index: FlatIndex,
    metadata: MetadataStore,
}

impl IndexGeneration {
    pub fn new(id: impl Into<String>, index: FlatIndex, metadata: MetadataStore) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(VectorStoreError::Misaligned {
                vectors: index.len(),
                ids: metadata.len(),
                texts: metadata.len(),
            });
        }
        Ok(Self {
            id: id.into(),
            index,
            metadata,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[must_use]
    pub const fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}

/// Generation directories under a data dir plus the `CURRENT` pointer.
///
/// A build writes a complete generation and then swaps the pointer with a rename,
/// so readers see either the old pair or the new pair, never a mix.
pub struct GenerationStore {
    data_dir: PathBuf,
    cached: RwLock<Option<Arc<IndexGeneration>>>,
}

impl GenerationStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cached: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Id of the published generation, if any.
    pub async fn current_id(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(current_pointer_path(&self.data_dir)).await {
            Ok(raw) => {
                let id = raw.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The published generation, reloaded only when the pointer has moved.
    pub async fn current(&self) -> Result<Arc<IndexGeneration>> {
        let Some(id) = self.current_id().await? else {
            return Err(VectorStoreError::IndexNotFound(format!(
                "no index has been built in {}",
                self.data_dir.display()
            )));
        };

        self.load_or_follow(id).await
    }

    /// Load `id`, or the pointer's new target if later builds pruned `id`
    /// after the pointer was read.
    async fn load_or_follow(&self, id: String) -> Result<Arc<IndexGeneration>> {
        match self.load_generation(&id).await {
            Err(VectorStoreError::IndexNotFound(what)) => match self.current_id().await? {
                Some(latest) if latest != id => {
                    log::debug!("Generation {id} was replaced by {latest} while loading");
                    self.load_generation(&latest).await
                }
                _ => Err(VectorStoreError::IndexNotFound(what)),
            },
            other => other,
        }
    }

    async fn load_generation(&self, id: &str) -> Result<Arc<IndexGeneration>> {
        if let Some(cached) = self.cached_generation() {
            if cached.id() == id {
                return Ok(cached);
            }
        }

        let dir = generation_dir(&self.data_dir, id);
        let index = FlatIndex::load(dir.join(INDEX_FILE_NAME)).await?;
        let metadata = MetadataStore::load(dir.join(METADATA_FILE_NAME)).await?;
        let generation = Arc::new(IndexGeneration::new(id, index, metadata)?);
        log::debug!(
            "Loaded index generation {} ({} fragments)",
            generation.id(),
            generation.index().len()
        );

        if let Ok(mut slot) = self.cached.write() {
            *slot = Some(generation.clone());
        }
        Ok(generation)
    }

    fn cached_generation(&self) -> Option<Arc<IndexGeneration>> {
        self.cached.read().ok().and_then(|slot| slot.clone())
    }

    /// Write a new generation and make it current. Returns the generation id.
    ///
    /// On failure the previous generation stays current.
    pub async fn publish(&self, index: &FlatIndex, metadata: &MetadataStore) -> Result<String> {
        if index.len() != metadata.len() {
            return Err(VectorStoreError::Misaligned {
                vectors: index.len(),
                ids: metadata.len(),
                texts: metadata.len(),
            });
        }

        let previous = self.current_id().await?;
        let id = new_generation_id();
        let dir = generation_dir(&self.data_dir, &id);

        if let Err(err) = write_generation(&dir, index, metadata).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                log::warn!("Failed to remove partial generation {}: {cleanup}", dir.display());
            }
            return Err(err);
        }

        let pointer = current_pointer_path(&self.data_dir);
        let tmp = pointer.with_extension("tmp");
        replace_file(&tmp, &pointer, format!("{id}\n").as_bytes()).await?;
        log::info!("Published index generation {id} ({} fragments)", index.len());

        self.prune(&id, previous.as_deref()).await;
        Ok(id)
    }

    /// Remove generations other than the current and the one it replaced.
    async fn prune(&self, current: &str, previous: Option<&str>) {
        let root = generations_dir(&self.data_dir);
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("Failed to list {}: {err}", root.display());
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == current || Some(name.as_str()) == previous {
                continue;
            }
            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => log::debug!("Pruned index generation {name}"),
                Err(err) => log::warn!("Failed to prune index generation {name}: {err}"),
            }
        }
    }
}

async fn write_generation(dir: &Path, index: &FlatIndex, metadata: &MetadataStore) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    index.save(dir.join(INDEX_FILE_NAME)).await?;
    metadata.save(dir.join(METADATA_FILE_NAME)).await?;
    Ok(())
}

/// Millisecond timestamp prefix keeps ids sortable by creation time.
fn new_generation_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis:013}-{}", &suffix[..8])
}
