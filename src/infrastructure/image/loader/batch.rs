//! Batch resolution: memory first on the caller, the rest in one pool task.

use tracing::debug;

use super::dispatcher::DispatchEvent;
use super::pipeline::FetchPipeline;
use crate::domain::entities::{BatchRequest, LoadOutcome};
use crate::domain::errors::LoadError;

/// Copies every memory-tier hit into the batch. Never blocks.
pub fn fill_from_memory(pipeline: &FetchPipeline, batch: &mut BatchRequest) {
    for identifier in batch.remaining() {
        if let LoadOutcome::Hit(image) = pipeline.check_memory(&batch.key_for(&identifier)) {
            batch.insert(&identifier, image);
        }
    }
}

/// Resolves the members still missing, one after another.
///
/// Keeps going after a failure so later members still warm the cache; the
/// first failure is the one reported.
pub async fn resolve_remaining(pipeline: &FetchPipeline, mut batch: BatchRequest) -> DispatchEvent {
    let mut first_failure: Option<LoadError> = None;

    for identifier in batch.remaining() {
        let key = batch.key_for(&identifier);
        match pipeline.resolve(&key).await {
            Ok(loaded) => {
                batch.insert(&identifier, loaded.image);
            }
            Err(e) => {
                debug!(identifier = %identifier, error = %e, "Batch member failed");
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        None if batch.is_complete() => DispatchEvent::BatchReady { batch },
        None => DispatchEvent::BatchPartialFailed {
            batch,
            cause: LoadError::network("Batch finished with unresolved members"),
        },
        Some(cause) => DispatchEvent::BatchPartialFailed { batch, cause },
    }
}
