use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const DEFAULT_DATA_DIR: &str = ".manualrag";

pub const CURRENT_POINTER_NAME: &str = "CURRENT";
pub const GENERATIONS_DIR_NAME: &str = "generations";
pub const INDEX_FILE_NAME: &str = "index.bin";
pub const METADATA_FILE_NAME: &str = "meta.json";
pub const INDEX_LOCK_NAME: &str = "index.lock";

/// File holding the id of the generation readers should use
#[must_use]
pub fn current_pointer_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CURRENT_POINTER_NAME)
}

#[must_use]
pub fn generations_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(GENERATIONS_DIR_NAME)
}

#[must_use]
pub fn generation_dir(data_dir: &Path, generation_id: &str) -> PathBuf {
    generations_dir(data_dir).join(generation_id)
}

/// Advisory lock serializing builds on one data directory
#[must_use]
pub fn index_lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join(INDEX_LOCK_NAME)
}

/// Write `bytes` to `tmp`, flush it to disk, then rename it over `path`.
pub(crate) async fn replace_file(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, path).await
}
