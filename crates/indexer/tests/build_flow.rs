use async_trait::async_trait;
use manualrag_config::{Config, MemoryConfigProvider};
use manualrag_indexer::{BatchLimits, IndexerError, IndexerSettings, ManualIndexer};
use manualrag_text_chunker::ChunkerConfig;
use manualrag_vector_store::{
    generations_dir, DefaultEmbeddingConnector, EmbeddingConnector, EmbeddingMode,
    EmbeddingService, EmbeddingSettings, GenerationStore, RetryPolicy, StubEmbeddingService,
    VectorStoreError,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 16;

fn settings() -> EmbeddingSettings {
    EmbeddingSettings {
        dimension: DIM,
        retry: RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        },
        ..EmbeddingSettings::default()
    }
}

/// Stub embeddings, except that any batch mentioning POISON fails.
struct PoisonConnector {
    settings: EmbeddingSettings,
}

struct PoisonService {
    inner: StubEmbeddingService,
}

#[async_trait]
impl EmbeddingService for PoisonService {
    fn model_id(&self) -> &str {
        "poison"
    }

    async fn embed(&self, texts: &[String]) -> manualrag_vector_store::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("POISON")) {
            return Err(VectorStoreError::EmbeddingError("503 unavailable".into()));
        }
        self.inner.embed(texts).await
    }
}

impl EmbeddingConnector for PoisonConnector {
    fn settings(&self) -> &EmbeddingSettings {
        &self.settings
    }

    fn connect(
        &self,
        _config: &Config,
    ) -> manualrag_vector_store::Result<Arc<dyn EmbeddingService>> {
        Ok(Arc::new(PoisonService {
            inner: StubEmbeddingService::new(self.settings.dimension),
        }))
    }
}

fn indexer(data_dir: &Path, connector: Arc<dyn EmbeddingConnector>) -> ManualIndexer {
    ManualIndexer::new(
        data_dir,
        Arc::new(MemoryConfigProvider::new(Config::default())),
        connector,
        IndexerSettings {
            chunker: ChunkerConfig::new(40, 10),
            limits: BatchLimits {
                batch_size: 1,
                max_workers: 4,
            },
        },
    )
    .expect("indexer")
}

fn stub_connector() -> Arc<dyn EmbeddingConnector> {
    Arc::new(DefaultEmbeddingConnector::new(EmbeddingMode::Stub, settings()))
}

fn write_manuals(dir: &Path, docs: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).expect("create manuals");
    for (name, text) in docs {
        std::fs::write(dir.join(name), text).expect("write manual");
    }
}

fn generation_count(data_dir: &Path) -> usize {
    std::fs::read_dir(generations_dir(data_dir))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn build_publishes_aligned_index_and_metadata() {
    let temp = TempDir::new().expect("tempdir");
    let manuals = temp.path().join("manuals");
    let data_dir = temp.path().join("data");
    write_manuals(
        &manuals,
        &[
            ("b-dryer.txt", "Clean the lint filter. Check the vent."),
            ("a-oven.md", "Preheat for ten minutes. Use the middle rack. Never block the fan."),
        ],
    );

    let stats = indexer(&data_dir, stub_connector())
        .build(&manuals)
        .await
        .expect("build");
    assert_eq!(stats.sources, vec!["a-oven.md", "b-dryer.txt"]);

    let generation = GenerationStore::new(&data_dir).current().await.expect("current");
    assert_eq!(Some(generation.id()), stats.generation.as_deref());
    assert_eq!(generation.index().len(), stats.fragments);
    assert_eq!(generation.metadata().len(), stats.fragments);
    assert_eq!(generation.index().dimension(), DIM);
    assert_eq!(
        generation.metadata().text(0),
        Some("Preheat for ten minutes.")
    );

    // Stub vectors are a function of the text, so each fragment finds itself.
    let stub = StubEmbeddingService::new(DIM);
    for position in 0..generation.metadata().len() {
        let text = generation.metadata().text(position).expect("text").to_string();
        let query = stub.embed(&[text]).await.expect("embed").remove(0);
        let hits = generation.index().search(&query, 1).expect("search");
        assert_eq!(hits[0].position, position);
    }
}

#[tokio::test]
async fn failing_batch_keeps_previous_generation() {
    let temp = TempDir::new().expect("tempdir");
    let manuals = temp.path().join("manuals");
    let data_dir = temp.path().join("data");
    write_manuals(&manuals, &[("a.txt", "Old manual text.")]);

    let first = indexer(&data_dir, stub_connector())
        .build(&manuals)
        .await
        .expect("first build");

    write_manuals(
        &manuals,
        &[
            ("b.txt", "Second manual."),
            ("c.txt", "POISON manual."),
            ("d.txt", "Fourth manual."),
        ],
    );
    let connector = Arc::new(PoisonConnector {
        settings: settings(),
    });
    let err = indexer(&data_dir, connector)
        .build(&manuals)
        .await
        .expect_err("poisoned build must fail");
    assert!(matches!(
        err,
        IndexerError::VectorStoreError(VectorStoreError::EmbeddingFailure { .. })
    ));

    let generation = GenerationStore::new(&data_dir).current().await.expect("current");
    assert_eq!(Some(generation.id()), first.generation.as_deref());
    assert_eq!(generation.metadata().len(), 1);
    assert_eq!(generation.metadata().text(0), Some("Old manual text."));
    assert_eq!(generation_count(&data_dir), 1);
}

#[tokio::test]
async fn empty_corpus_is_rejected_and_previous_generation_survives() {
    let temp = TempDir::new().expect("tempdir");
    let manuals = temp.path().join("manuals");
    let data_dir = temp.path().join("data");
    write_manuals(&manuals, &[("a.txt", "Keep me.")]);
    indexer(&data_dir, stub_connector())
        .build(&manuals)
        .await
        .expect("first build");

    std::fs::remove_file(manuals.join("a.txt")).expect("remove");
    std::fs::write(manuals.join("notes.pdf"), b"%PDF").expect("write pdf");

    let err = indexer(&data_dir, stub_connector())
        .build(&manuals)
        .await
        .expect_err("empty corpus");
    assert!(matches!(err, IndexerError::Validation(_)));

    let generation = GenerationStore::new(&data_dir).current().await.expect("current");
    assert_eq!(generation.metadata().text(0), Some("Keep me."));
}

#[tokio::test]
async fn openai_mode_without_credential_fails_before_embedding() {
    let temp = TempDir::new().expect("tempdir");
    let manuals = temp.path().join("manuals");
    write_manuals(&manuals, &[("a.txt", "Text.")]);

    let connector = Arc::new(DefaultEmbeddingConnector::new(
        EmbeddingMode::OpenAi,
        settings(),
    ));
    let err = indexer(&temp.path().join("data"), connector)
        .build(&manuals)
        .await
        .expect_err("missing credential");
    assert!(matches!(
        err,
        IndexerError::VectorStoreError(VectorStoreError::ConfigError(_))
    ));
}
