//! # Fulfillment Pipeline
//!
//! Admission of new orders, one Stage Runner per order, and cooperative
//! cancellation.
//!
//! ```text
//! enqueue_order(id) ──► AdmissionQueue ──► Dispatcher ──spawn──► StageRunner (per order)
//!                                                                   │   ▲
//!                                        PersistenceGateway ◄── write   │ is_cancelled
//!                                        CacheGateway       ◄── publish │
//! signal_cancel(id) ──► CancellationRegistry ─────────────────────────┘
//! ```
//!
//! - [`AdmissionQueue`] - bounded, non-blocking; overflow is dropped
//! - [`Dispatcher`] - drains the queue, optionally capped by a semaphore
//! - [`StageRunner`] - per-order state machine, see [`runner`]
//! - [`CancellationRegistry`] - local set backed by the shared cache
//! - [`PipelineContext`] - owns all of the above plus the gateways
//!
//! [`start`] wires them together and returns a [`PipelineHandle`].

pub mod context;
pub mod dispatcher;
pub mod queue;
pub mod registry;
pub mod runner;

pub use context::PipelineContext;
pub use dispatcher::{Dispatcher, PipelineHandle};
pub use queue::{admission_queue, Admission, AdmissionQueue, AdmissionReceiver};
pub use registry::CancellationRegistry;
pub use runner::{RunOutcome, StageRunner, TransitionOutcome};

use crate::config::PipelineConfig;
use crate::gateway::{CacheGateway, PersistenceGateway};
use std::sync::Arc;

/// Builds a context for `config` and spawns its dispatcher.
///
/// Must be called from within a Tokio runtime.
pub fn start(
    config: PipelineConfig,
    persistence: Arc<dyn PersistenceGateway>,
    cache: Arc<dyn CacheGateway>,
) -> PipelineHandle {
    let (context, receiver) = PipelineContext::new(config, persistence, cache);
    PipelineHandle::spawn(context, receiver)
}
