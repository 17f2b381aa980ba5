//! Delivers load results to consumers, dropping the ones nobody wants anymore.

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{BatchRequest, ConsumerHandle, DisplayContent, SharedImage};
use crate::domain::errors::LoadError;

/// Message sent from a worker when a request settles.
#[derive(Debug)]
pub enum DispatchEvent {
    /// A single image resolved.
    SingleReady {
        /// Consumer that asked for it.
        consumer: ConsumerHandle,
        /// Identifier that was loaded.
        identifier: String,
        /// The decoded image.
        image: SharedImage,
    },
    /// A single image failed.
    SingleFailed {
        /// Consumer that asked for it.
        consumer: ConsumerHandle,
        /// Identifier that failed.
        identifier: String,
        /// Why it failed.
        cause: LoadError,
    },
    /// Every member of a batch resolved.
    BatchReady {
        /// The completed batch.
        batch: BatchRequest,
    },
    /// At least one member of a batch failed.
    BatchPartialFailed {
        /// The incomplete batch.
        batch: BatchRequest,
        /// First failure encountered.
        cause: LoadError,
    },
}

/// What the dispatcher did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Images were handed to the consumer.
    Applied,
    /// The consumer's error placeholder was shown.
    PlaceholderApplied,
    /// The consumer had moved on; nothing was shown.
    Stale,
    /// A failure with nothing to show.
    Dropped,
}

/// Receiving end of the event channel.
///
/// Must be pumped on the thread that owns the display targets.
#[derive(Debug)]
pub struct ResultDispatcher {
    events: mpsc::UnboundedReceiver<DispatchEvent>,
}

impl ResultDispatcher {
    pub(crate) const fn new(events: mpsc::UnboundedReceiver<DispatchEvent>) -> Self {
        Self { events }
    }

    /// Applies one event, honouring the consumer's current interest.
    pub fn apply(event: DispatchEvent) -> DispatchOutcome {
        match event {
            DispatchEvent::SingleReady {
                consumer,
                identifier,
                image,
            } => {
                if !consumer.wants_single(&identifier) {
                    trace!(consumer = consumer.id(), identifier = %identifier, "Discarding stale image");
                    return DispatchOutcome::Stale;
                }
                consumer.apply(DisplayContent::Single(image));
                debug!(consumer = consumer.id(), identifier = %identifier, "Image applied");
                DispatchOutcome::Applied
            }
            DispatchEvent::SingleFailed {
                consumer,
                identifier,
                cause,
            } => {
                if !consumer.wants_single(&identifier) {
                    trace!(consumer = consumer.id(), identifier = %identifier, "Discarding stale failure");
                    return DispatchOutcome::Stale;
                }
                match consumer.error_placeholder() {
                    Some(placeholder) => {
                        info!(
                            consumer = consumer.id(),
                            identifier = %identifier,
                            error = %cause,
                            "Load failed, showing placeholder"
                        );
                        consumer.apply(DisplayContent::Single(placeholder));
                        DispatchOutcome::PlaceholderApplied
                    }
                    None => {
                        warn!(consumer = consumer.id(), identifier = %identifier, error = %cause, "Load failed");
                        DispatchOutcome::Dropped
                    }
                }
            }
            DispatchEvent::BatchReady { batch } => {
                let consumer = batch.consumer();
                if !consumer.wants_batch(batch.identifiers()) {
                    trace!(consumer = consumer.id(), count = batch.identifiers().len(), "Discarding stale batch");
                    return DispatchOutcome::Stale;
                }
                let Some(images) = batch.ordered_images() else {
                    warn!(consumer = consumer.id(), "Batch reported ready while incomplete");
                    return DispatchOutcome::Dropped;
                };
                debug!(consumer = consumer.id(), count = images.len(), "Batch applied");
                consumer.apply(DisplayContent::Multiple(images));
                DispatchOutcome::Applied
            }
            DispatchEvent::BatchPartialFailed { batch, cause } => {
                warn!(
                    consumer = batch.consumer().id(),
                    resolved = batch.results().len(),
                    requested = batch.identifiers().len(),
                    error = %cause,
                    "Batch failed, discarding partial results"
                );
                DispatchOutcome::Dropped
            }
        }
    }

    /// Applies every event already queued without waiting.
    pub fn drain(&mut self) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            outcomes.push(Self::apply(event));
        }
        outcomes
    }

    /// Waits for the next event and applies it.
    ///
    /// Returns `None` once the loader and every in-flight task are gone.
    pub async fn next(&mut self) -> Option<DispatchOutcome> {
        let event = self.events.recv().await?;
        Some(Self::apply(event))
    }

    /// Applies events until the channel closes.
    pub async fn run(mut self) {
        while self.next().await.is_some() {}
        debug!("Dispatcher stopped");
    }
}
