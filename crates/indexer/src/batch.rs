use crate::error::{IndexerError, Result};
use crate::limits::BatchLimits;
use manualrag_vector_store::{EmbeddingClient, Fragment};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Embed every fragment, `batch_size` per request and at most `max_workers` requests in flight.
///
/// Output position `i` holds the vector of `fragments[i]` regardless of the order in which
/// batches complete. The first failed batch aborts the rest and fails the whole call.
pub async fn embed_all(
    client: &EmbeddingClient,
    fragments: &[Fragment],
    limits: BatchLimits,
) -> Result<Vec<Vec<f32>>> {
    let limits = limits.normalized();
    if fragments.is_empty() {
        return Ok(vec![]);
    }

    let semaphore = Arc::new(Semaphore::new(limits.max_workers));
    let mut tasks = JoinSet::new();
    let total_batches = fragments.len().div_ceil(limits.batch_size);

    for (batch_no, batch) in fragments.chunks(limits.batch_size).enumerate() {
        let offset = batch_no * limits.batch_size;
        let texts: Vec<String> = batch.iter().map(|f| f.text.clone()).collect();
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| IndexerError::Other(format!("semaphore error: {e}")))?;
            log::debug!(
                "Embedding batch {}/{total_batches} ({} fragments at offset {offset})",
                batch_no + 1,
                texts.len()
            );
            let vectors = client.embed_batch(&texts).await?;
            Ok::<_, IndexerError>((offset, vectors))
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; fragments.len()];
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|e| IndexerError::Other(format!("embedding task failed: {e}")))
            .and_then(|result| result);
        let (offset, vectors) = match outcome {
            Ok(done) => done,
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        };
        for (slot, vector) in slots[offset..].iter_mut().zip(vectors) {
            *slot = Some(vector);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.ok_or_else(|| {
                IndexerError::Other(format!("no embedding produced for fragment {position}"))
            })
        })
        .collect()
}
