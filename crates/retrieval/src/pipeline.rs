use crate::error::{Result, RetrievalError};
use crate::generator::Generator;
use crate::prompt::{GroundingPrompt, RetrievedFragment};
use manualrag_config::ConfigProvider;
use manualrag_vector_store::{EmbeddingConnector, GenerationStore, VectorStoreError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 5;

/// Question → embedding → nearest fragments → grounding prompt.
pub struct RetrievalPipeline {
    store: GenerationStore,
    config: Arc<dyn ConfigProvider>,
    connector: Arc<dyn EmbeddingConnector>,
}

impl RetrievalPipeline {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        config: Arc<dyn ConfigProvider>,
        connector: Arc<dyn EmbeddingConnector>,
    ) -> Self {
        Self {
            store: GenerationStore::new(data_dir),
            config,
            connector,
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.store.data_dir()
    }

    /// Retrieve the `k` closest fragments and assemble the prompt.
    ///
    /// Configuration is loaded on every call. A blank question fails before
    /// anything is read or embedded.
    pub async fn answer_context(&self, question: &str, k: usize) -> Result<GroundingPrompt> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::Validation("question is empty".to_string()));
        }
        if k == 0 {
            return Err(RetrievalError::Validation(
                "number of fragments must be at least 1".to_string(),
            ));
        }

        let generation = self.store.current().await?;
        let config = self.config.load().await?;
        let client = self.connector.client(&config)?;

        let query = client.embed(question).await?;
        let hits = generation.index().search(&query, k)?;
        log::debug!(
            "Retrieved {} fragments from generation {}",
            hits.len(),
            generation.id()
        );

        let metadata = generation.metadata();
        let fragments = hits
            .into_iter()
            .map(|hit| {
                let (Some(id), Some(text)) = (metadata.id(hit.position), metadata.text(hit.position))
                else {
                    return Err(RetrievalError::VectorStoreError(VectorStoreError::CorruptIndex(
                        format!("no metadata for position {}", hit.position),
                    )));
                };
                Ok(RetrievedFragment {
                    position: hit.position,
                    id: id.to_string(),
                    text: text.to_string(),
                    distance: hit.distance,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(GroundingPrompt::new(&config.system_context, question, fragments))
    }

    /// Retrieve, then stream the generated answer into `on_token`.
    pub async fn answer(
        &self,
        question: &str,
        k: usize,
        generator: &dyn Generator,
        on_token: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<GroundingPrompt> {
        let prompt = self.answer_context(question, k).await?;
        generator.generate(&prompt, on_token).await?;
        Ok(prompt)
    }
}
