//! Async image loading orchestrator.
//!
//! Implements a three-tier cache: Memory -> Disk -> Network. Memory hits are
//! applied on the caller's thread; everything else runs on the worker pool
//! and comes back through the [`ResultDispatcher`].

mod batch;
mod dispatcher;
mod global;
mod pipeline;
mod pool;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

pub use dispatcher::{DispatchEvent, DispatchOutcome, ResultDispatcher};
pub use global::{global, install};
pub use pipeline::{FetchPipeline, FetchState};
pub use pool::WorkerPool;

use super::http_fetcher::HttpImageFetcher;
use super::tiered_cache::TieredImageCache;
use crate::domain::entities::{BatchRequest, CacheKey, ConsumerHandle, LoadOutcome, LoadRequest};
use crate::domain::errors::LoadError;
use crate::domain::ports::{ImageCachePort, ImageFetchPort};
use crate::infrastructure::config::LoaderConfig;

/// What a load call did before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Served from memory and already shown.
    Applied,
    /// Handed to the worker pool; the result arrives through the dispatcher.
    Scheduled,
}

/// Orchestrates image loading from memory, disk, and network.
pub struct ImageLoader {
    pipeline: Arc<FetchPipeline>,
    pool: WorkerPool,
    events: mpsc::UnboundedSender<DispatchEvent>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Creates a loader and the dispatcher that delivers its results.
    #[must_use]
    pub fn new(
        pool: WorkerPool,
        cache: Arc<dyn ImageCachePort>,
        fetcher: Arc<dyn ImageFetchPort>,
        persist_raw: bool,
    ) -> (Self, ResultDispatcher) {
        let (events, rx) = mpsc::unbounded_channel();
        let loader = Self {
            pipeline: Arc::new(FetchPipeline::new(cache, fetcher, persist_raw)),
            pool,
            events,
        };
        (loader, ResultDispatcher::new(rx))
    }

    /// Builds a loader over the default tiered cache and HTTP fetcher.
    ///
    /// # Errors
    /// Returns error if the disk cache, HTTP client or worker pool cannot be
    /// created.
    pub async fn from_config(config: &LoaderConfig) -> Result<(Self, ResultDispatcher), LoadError> {
        let cache = TieredImageCache::open(config).await?;
        let fetcher = HttpImageFetcher::new(&config.network)?;
        let pool = WorkerPool::new(&config.pool)?;
        debug!(persist_raw = config.persist_raw, "Image loader configured");
        Ok(Self::new(
            pool,
            Arc::new(cache),
            Arc::new(fetcher),
            config.persist_raw,
        ))
    }

    /// Loads one image for `consumer`.
    ///
    /// The consumer's interest is replaced before anything else happens, so
    /// results of earlier calls for the same consumer become stale.
    ///
    /// # Errors
    /// Returns `CallerError` for an empty identifier.
    pub fn load_single(
        &self,
        identifier: &str,
        consumer: &ConsumerHandle,
        width: u32,
        height: u32,
    ) -> Result<LoadStatus, LoadError> {
        if identifier.trim().is_empty() {
            return Err(LoadError::caller("Identifier must not be empty"));
        }

        let request = LoadRequest::new(CacheKey::new(identifier, width, height), consumer.clone());
        consumer.set_interest(request.tag());

        if let LoadOutcome::Hit(image) = self.pipeline.check_memory(request.key()) {
            trace!(key = %request.key(), "Memory hit, applying on caller");
            ResultDispatcher::apply(DispatchEvent::SingleReady {
                consumer: consumer.clone(),
                identifier: identifier.to_string(),
                image,
            });
            return Ok(LoadStatus::Applied);
        }

        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        self.pool.submit(async move {
            let (key, consumer) = request.into_parts();
            let identifier = key.identifier().to_string();
            let event = match pipeline.resolve(&key).await {
                Ok(loaded) => DispatchEvent::SingleReady {
                    consumer,
                    identifier,
                    image: loaded.image,
                },
                Err(cause) => DispatchEvent::SingleFailed {
                    consumer,
                    identifier,
                    cause,
                },
            };
            if events.send(event).is_err() {
                error!(key = %key, "Dispatcher closed, dropping result");
            }
        });
        Ok(LoadStatus::Scheduled)
    }

    /// Loads several images at one shared size. Nothing is shown until every
    /// image has resolved; if any fails, nothing is shown at all.
    ///
    /// # Errors
    /// Returns `CallerError` for an empty list or an empty identifier.
    pub fn load_batch<S: AsRef<str>>(
        &self,
        identifiers: &[S],
        consumer: &ConsumerHandle,
        width: u32,
        height: u32,
    ) -> Result<LoadStatus, LoadError> {
        match identifiers {
            [] => return Err(LoadError::caller("Batch must contain at least one identifier")),
            [only] => return self.load_single(only.as_ref(), consumer, width, height),
            _ => {}
        }
        if identifiers.iter().any(|id| id.as_ref().trim().is_empty()) {
            return Err(LoadError::caller("Identifier must not be empty"));
        }

        let identifiers: Vec<String> = identifiers.iter().map(|id| id.as_ref().to_string()).collect();
        let mut request = BatchRequest::new(identifiers, consumer.clone(), width, height);
        consumer.set_interest(request.tag());

        batch::fill_from_memory(&self.pipeline, &mut request);
        if request.is_complete() {
            trace!(count = request.identifiers().len(), "Batch served from memory");
            ResultDispatcher::apply(DispatchEvent::BatchReady { batch: request });
            return Ok(LoadStatus::Applied);
        }

        debug!(
            count = request.identifiers().len(),
            from_memory = request.results().len(),
            "Scheduling batch"
        );
        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        self.pool.submit(async move {
            let event = batch::resolve_remaining(&pipeline, request).await;
            if events.send(event).is_err() {
                error!("Dispatcher closed, dropping batch result");
            }
        });
        Ok(LoadStatus::Scheduled)
    }

    /// Drops every cached image in both tiers.
    ///
    /// # Errors
    /// Returns error if the durable tier cannot be cleared.
    pub async fn clear_caches(&self) -> Result<(), LoadError> {
        self.pipeline.cache().clear().await
    }

    /// The worker pool running load tasks.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}
