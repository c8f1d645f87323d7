use crate::{IndexerError, Result};
use fs2::FileExt;
use manualrag_vector_store::index_lock_path;
use std::path::Path;
use std::time::Instant;

/// Exclusive build lock on a data directory, released on drop.
pub(crate) struct IndexWriteLock {
    file: std::fs::File,
}

impl Drop for IndexWriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) async fn acquire_index_write_lock(data_dir: &Path) -> Result<IndexWriteLock> {
    let path = index_lock_path(data_dir);
    tokio::fs::create_dir_all(data_dir).await?;

    tokio::task::spawn_blocking(move || -> Result<IndexWriteLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                IndexerError::Other(format!("open index lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            IndexerError::Other(format!("acquire index lock {}: {err}", path.display()))
        })?;
        let waited = start.elapsed();
        if waited.as_millis() > 0 {
            log::info!("Waited {waited:?} for index lock {}", path.display());
        }

        Ok(IndexWriteLock { file })
    })
    .await
    .map_err(|err| IndexerError::Other(format!("join index lock task: {err}")))?
}
