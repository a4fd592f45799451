//! State shared by one pipeline instance.

use crate::config::PipelineConfig;
use crate::gateway::{CacheGateway, PersistenceGateway};
use crate::model::OrderId;
use crate::pipeline::queue::{admission_queue, Admission, AdmissionQueue, AdmissionReceiver};
use crate::pipeline::registry::CancellationRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Everything the Dispatcher and its Stage Runners share.
///
/// Held behind an `Arc`; one context per pipeline instance, so independent
/// pipelines (tests, multiple tenants) never see each other's queue or
/// registry.
pub struct PipelineContext {
    queue: AdmissionQueue,
    registry: CancellationRegistry,
    persistence: Arc<dyn PersistenceGateway>,
    cache: Arc<dyn CacheGateway>,
    config: PipelineConfig,
    active_runners: AtomicUsize,
}

impl PipelineContext {
    /// Builds a context and the receiving end of its admission queue.
    pub fn new(
        config: PipelineConfig,
        persistence: Arc<dyn PersistenceGateway>,
        cache: Arc<dyn CacheGateway>,
    ) -> (Arc<Self>, AdmissionReceiver) {
        let (queue, receiver) = admission_queue(config.queue_capacity);
        let context = Self {
            queue,
            registry: CancellationRegistry::new(cache.clone()),
            persistence,
            cache,
            config,
            active_runners: AtomicUsize::new(0),
        };
        (Arc::new(context), receiver)
    }

    /// Hands a freshly created order to the pipeline. Never blocks or fails;
    /// see [`Admission`].
    pub fn enqueue_order(&self, order_id: OrderId) -> Admission {
        self.queue.enqueue(order_id)
    }

    /// Requests cancellation of an order. Safe to call repeatedly and from
    /// any task.
    pub async fn signal_cancel(&self, order_id: OrderId) {
        self.registry.signal(order_id).await;
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    pub fn persistence(&self) -> &Arc<dyn PersistenceGateway> {
        &self.persistence
    }

    pub fn cache(&self) -> &Arc<dyn CacheGateway> {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage Runners currently alive.
    pub fn active_runners(&self) -> usize {
        self.active_runners.load(Ordering::SeqCst)
    }

    pub(crate) fn runner_started(self: &Arc<Self>) -> ActiveRunner {
        self.active_runners.fetch_add(1, Ordering::SeqCst);
        ActiveRunner {
            context: Arc::clone(self),
        }
    }
}

/// Counts one live runner; decrements on drop, including on panic.
pub(crate) struct ActiveRunner {
    context: Arc<PipelineContext>,
}

impl Drop for ActiveRunner {
    fn drop(&mut self) {
        self.context.active_runners.fetch_sub(1, Ordering::SeqCst);
    }
}
