use crate::batch::embed_all;
use crate::error::{IndexerError, Result};
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::index_lock::acquire_index_write_lock;
use crate::limits::BatchLimits;
use crate::scanner::DocumentScanner;
use crate::stats::IndexStats;
use manualrag_config::ConfigProvider;
use manualrag_text_chunker::{Chunker, ChunkerConfig};
use manualrag_vector_store::{
    EmbeddingConnector, FlatIndex, Fragment, GenerationStore, MetadataStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Tunables for a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexerSettings {
    pub chunker: ChunkerConfig,
    pub limits: BatchLimits,
}

impl IndexerSettings {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            limits: BatchLimits::from_env(),
        }
    }
}

/// Rebuilds the whole index from a folder of manuals.
pub struct ManualIndexer {
    store: GenerationStore,
    config: Arc<dyn ConfigProvider>,
    connector: Arc<dyn EmbeddingConnector>,
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
    limits: BatchLimits,
}

impl ManualIndexer {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        config: Arc<dyn ConfigProvider>,
        connector: Arc<dyn EmbeddingConnector>,
        settings: IndexerSettings,
    ) -> Result<Self> {
        Ok(Self {
            store: GenerationStore::new(data_dir),
            config,
            connector,
            extractor: Arc::new(PlainTextExtractor::new()),
            chunker: Chunker::new(settings.chunker)?,
            limits: settings.limits.normalized(),
        })
    }

    /// Replace the plain-text extractor, e.g. with a PDF or OCR backend.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.store.data_dir()
    }

    /// Full rebuild: extract, chunk, embed, then publish a new generation.
    ///
    /// Nothing is published unless every fragment was embedded; on any error the
    /// previous generation stays current.
    pub async fn build(&self, manuals_dir: &Path) -> Result<IndexStats> {
        let started = Instant::now();
        let _lock = acquire_index_write_lock(self.store.data_dir()).await?;
        log::info!("Indexing manuals in {}", manuals_dir.display());

        let config = self.config.load().await?;
        let client = self.connector.client(&config)?;

        let documents = DocumentScanner::new(manuals_dir).scan(self.extractor.as_ref())?;
        let mut stats = IndexStats::new();
        let fragments = self.collect_fragments(&documents, &mut stats).await;
        if fragments.is_empty() {
            return Err(IndexerError::Validation(format!(
                "no text found in {}; nothing to index",
                manuals_dir.display()
            )));
        }

        log::info!(
            "Embedding {} fragments from {} documents with {}",
            fragments.len(),
            stats.documents,
            client.model_id()
        );
        let vectors = embed_all(&client, &fragments, self.limits).await?;

        let index = FlatIndex::build(client.dimension(), &vectors)?;
        let metadata = MetadataStore::from_fragments(&fragments);
        let generation = self.store.publish(&index, &metadata).await?;

        stats.batches = fragments.len().div_ceil(self.limits.batch_size);
        stats.generation = Some(generation);
        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Indexing completed: {} documents, {} fragments in {} ms",
            stats.documents,
            stats.fragments,
            stats.time_ms
        );
        Ok(stats)
    }

    async fn collect_fragments(&self, documents: &[PathBuf], stats: &mut IndexStats) -> Vec<Fragment> {
        let mut fragments = Vec::new();

        for path in documents {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let extracted = match self.extractor.extract(path).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    stats.add_error(format!("{name}: {e}"));
                    continue;
                }
            };
            for warning in extracted.warnings {
                log::warn!("{name}: {warning}");
                stats.add_warning(format!("{name}: {warning}"));
            }

            let chunks = self.chunker.chunk(&extracted.text);
            if chunks.is_empty() {
                log::warn!("No text extracted from {name}");
                stats.add_warning(format!("{name}: no text"));
                continue;
            }

            log::debug!("{name}: {} fragments", chunks.len());
            stats.add_document(chunks.len());
            stats.sources.push(name.clone());
            for chunk in chunks {
                let order = fragments.len();
                fragments.push(Fragment::new(chunk, order, name.as_str()));
            }
        }

        fragments
    }
}
