//! # Stage Runner
//!
//! One task per admitted order. For each stage in [`Stage::PIPELINE`]:
//!
//! 1. registry check, exit cancelled if set
//! 2. shared cancel flag check, signal and exit cancelled if set
//! 3. wait the stage delay
//! 4. registry check again, exit cancelled without writing the stage
//! 5. persist the stage, then publish it to the cache
//!
//! A cancel that lands between steps 4 and 5 still lets that one stage
//! through; the durable store refuses anything after it.
//!
//! Read failures in steps 1, 2 and 4 count as "not cancelled". What happens
//! after a failed write in step 5 depends on the [`FailurePolicy`].

use crate::config::FailurePolicy;
use crate::gateway::GatewayError;
use crate::model::{OrderId, Stage};
use crate::pipeline::context::PipelineContext;
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Result of recording one stage (persist + publish).
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Persisted and published.
    Applied,
    /// Something failed but nothing was refused: either the durable write
    /// hit a retryable error, or only the cache publish failed.
    Degraded {
        persisted: bool,
        error: GatewayError,
    },
    /// The durable store refused the write.
    Failed(GatewayError),
}

impl TransitionOutcome {
    pub fn persisted(&self) -> bool {
        match self {
            TransitionOutcome::Applied => true,
            TransitionOutcome::Degraded { persisted, .. } => *persisted,
            TransitionOutcome::Failed(_) => false,
        }
    }
}

/// How a Stage Runner ended. Every variant carries the stages that were
/// durably recorded, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { persisted: Vec<Stage> },
    /// Stopped before `pending` was written.
    Cancelled { persisted: Vec<Stage>, pending: Stage },
    /// Stopped by [`FailurePolicy::Halt`] after `stage` failed.
    Halted {
        persisted: Vec<Stage>,
        stage: Stage,
        error: GatewayError,
    },
}

impl RunOutcome {
    pub fn persisted(&self) -> &[Stage] {
        match self {
            RunOutcome::Completed { persisted }
            | RunOutcome::Cancelled { persisted, .. }
            | RunOutcome::Halted { persisted, .. } => persisted,
        }
    }
}

pub struct StageRunner {
    order_id: OrderId,
    context: Arc<PipelineContext>,
}

impl StageRunner {
    pub fn new(order_id: OrderId, context: Arc<PipelineContext>) -> Self {
        Self { order_id, context }
    }

    /// Drives the order to completion, cancellation or halt.
    pub async fn run(self) -> RunOutcome {
        let id = self.order_id;
        let mut persisted = Vec::with_capacity(Stage::PIPELINE.len());
        debug!(order_id = %id, "Runner started");

        for stage in Stage::PIPELINE {
            if self.cancelled_before(stage).await {
                return self.finish(RunOutcome::Cancelled {
                    persisted,
                    pending: stage,
                });
            }

            if self.wait_stage_delay().await {
                debug!(order_id = %id, %stage, "Delay cut short by cancel");
                return self.finish(RunOutcome::Cancelled {
                    persisted,
                    pending: stage,
                });
            }

            if self.context.registry().is_cancelled(id).await {
                debug!(order_id = %id, %stage, "Cancelled during delay");
                return self.finish(RunOutcome::Cancelled {
                    persisted,
                    pending: stage,
                });
            }

            let outcome = self.transition(stage).await;
            if outcome.persisted() {
                persisted.push(stage);
            }
            match outcome {
                TransitionOutcome::Applied => {
                    info!(order_id = %id, %stage, "Stage recorded");
                }
                TransitionOutcome::Degraded { persisted: written, error } => {
                    warn!(order_id = %id, %stage, written, error = %error, "Stage recorded with errors");
                }
                TransitionOutcome::Failed(error) => {
                    warn!(order_id = %id, %stage, error = %error, "Stage write refused");
                    if self.context.config().failure_policy == FailurePolicy::Halt {
                        return self.finish(RunOutcome::Halted {
                            persisted,
                            stage,
                            error,
                        });
                    }
                }
            }
        }

        self.finish(RunOutcome::Completed { persisted })
    }

    /// Steps 1 and 2.
    async fn cancelled_before(&self, stage: Stage) -> bool {
        let id = self.order_id;
        if self.context.registry().is_cancelled(id).await {
            debug!(order_id = %id, %stage, "Cancelled before stage");
            return true;
        }
        match self.context.cache().get_cancelled(id).await {
            Ok(true) => {
                debug!(order_id = %id, %stage, "Shared cancel flag set");
                self.context.registry().signal(id).await;
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(order_id = %id, error = %e, "Shared cancel flag unreadable, continuing");
                false
            }
        }
    }

    /// Step 3. Returns `true` when a cancellable delay ended early.
    ///
    /// Only the local registry tier can cut a delay short; a flag that only
    /// exists in the shared store is picked up by the check after the delay.
    async fn wait_stage_delay(&self) -> bool {
        let deadline = Instant::now() + self.context.config().stage_delay();
        if !self.context.config().cancellable_delay {
            sleep_until(deadline).await;
            return false;
        }

        // Subscribe before checking so a signal in between is not missed
        let mut signals = self.context.registry().subscribe();
        loop {
            if self.context.registry().is_cancelled_locally(self.order_id) {
                return true;
            }
            tokio::select! {
                _ = sleep_until(deadline) => return false,
                changed = signals.changed() => {
                    if changed.is_err() {
                        sleep_until(deadline).await;
                        return false;
                    }
                }
            }
        }
    }

    /// Step 5. Publishes even when the durable write failed.
    async fn transition(&self, stage: Stage) -> TransitionOutcome {
        let id = self.order_id;
        let write = self.context.persistence().update_order_stage(id, stage).await;
        let publish = self.context.cache().set_live_stage(id, stage).await;

        match (write, publish) {
            (Ok(()), Ok(())) => TransitionOutcome::Applied,
            (Ok(()), Err(error)) => TransitionOutcome::Degraded {
                persisted: true,
                error,
            },
            (Err(error), _) if error.is_retryable() => TransitionOutcome::Degraded {
                persisted: false,
                error,
            },
            (Err(error), _) => TransitionOutcome::Failed(error),
        }
    }

    fn finish(&self, outcome: RunOutcome) -> RunOutcome {
        let id = self.order_id;
        match &outcome {
            RunOutcome::Completed { persisted } => {
                info!(order_id = %id, stages = persisted.len(), "Order delivered");
            }
            RunOutcome::Cancelled { persisted, pending } => {
                info!(order_id = %id, stages = persisted.len(), %pending, "Order cancelled");
            }
            RunOutcome::Halted { stage, error, .. } => {
                warn!(order_id = %id, %stage, error = %error, "Runner halted");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::OrderStoreClient;
    use crate::config::PipelineConfig;
    use crate::gateway::mock::{MockCache, MockPersistence};
    use crate::gateway::{CacheGateway, PersistenceGateway};
    use crate::model::UserId;
    use crate::order_store;
    use std::time::Duration;

    const DELAY: Duration = Duration::from_secs(5);

    struct Harness {
        context: Arc<PipelineContext>,
        persistence: MockPersistence,
        cache: MockCache,
    }

    async fn harness(config: PipelineConfig) -> (Harness, OrderId) {
        let (actor, client) = order_store::new();
        tokio::spawn(actor.run());
        let persistence = MockPersistence::wrap(Arc::new(OrderStoreClient::new(client)));
        let cache = MockCache::new();
        let id = persistence.create_order(UserId(1), "parcel").await.unwrap();
        let (context, _receiver) = PipelineContext::new(
            config,
            Arc::new(persistence.clone()),
            Arc::new(cache.clone()),
        );
        (
            Harness {
                context,
                persistence,
                cache,
            },
            id,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_stage_in_order() {
        let (h, id) = harness(PipelineConfig::default()).await;
        let started = Instant::now();

        let outcome = StageRunner::new(id, h.context.clone()).run().await;

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                persisted: Stage::PIPELINE.to_vec()
            }
        );
        assert!(started.elapsed() >= DELAY * 3);
        assert!(started.elapsed() < DELAY * 3 + Duration::from_secs(1));
        assert_eq!(h.cache.published_stages(id), Stage::PIPELINE.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_writes_nothing() {
        let (h, id) = harness(PipelineConfig::default()).await;
        h.context.signal_cancel(id).await;

        let outcome = StageRunner::new(id, h.context.clone()).run().await;

        assert_eq!(
            outcome,
            RunOutcome::Cancelled {
                persisted: vec![],
                pending: Stage::Dispatched
            }
        );
        assert!(h.persistence.stage_writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_flag_is_adopted_locally() {
        let (h, id) = harness(PipelineConfig::default()).await;
        h.cache.backing().set_cancelled(id).await.unwrap();

        let outcome = StageRunner::new(id, h.context.clone()).run().await;

        assert!(matches!(outcome, RunOutcome::Cancelled { .. }));
        assert!(h.context.registry().is_cancelled_locally(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_skips_that_stage() {
        let (h, id) = harness(PipelineConfig::default()).await;
        let runner = tokio::spawn(StageRunner::new(id, h.context.clone()).run());

        tokio::time::sleep(DELAY + DELAY / 2).await;
        h.context.signal_cancel(id).await;

        let outcome = runner.await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Cancelled {
                persisted: vec![Stage::Dispatched],
                pending: Stage::InTransit
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_delay_exits_early() {
        let config = PipelineConfig::default().with_cancellable_delay(true);
        let (h, id) = harness(config).await;
        let started = Instant::now();
        let runner = tokio::spawn(StageRunner::new(id, h.context.clone()).run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        h.context.signal_cancel(id).await;

        let outcome = runner.await.unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled { pending: Stage::Dispatched, .. }));
        assert!(started.elapsed() < DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_continues_until_store_refuses() {
        let (h, id) = harness(PipelineConfig::default().with_failure_policy(FailurePolicy::Halt)).await;
        h.persistence
            .fail_next_stage_write(GatewayError::Unavailable("db down".into()));

        let outcome = StageRunner::new(id, h.context.clone()).run().await;

        // Dispatched never reached the store, so it refuses in_transit as
        // out of order and the halt policy stops there
        assert!(matches!(
            outcome,
            RunOutcome::Halted { stage: Stage::InTransit, .. }
        ));
        assert!(outcome.persisted().is_empty());
        assert_eq!(h.cache.published_stages(id), vec![Stage::Dispatched, Stage::InTransit]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_write_failure_continues_by_default() {
        let (h, id) = harness(PipelineConfig::default()).await;
        h.persistence
            .fail_next_stage_write(GatewayError::Rejected("constraint".into()));

        let outcome = StageRunner::new(id, h.context.clone()).run().await;

        assert!(matches!(outcome, RunOutcome::Completed { .. }));
        assert_eq!(h.persistence.stage_writes().len(), 3);
        assert_eq!(h.cache.published_stages(id), Stage::PIPELINE.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_is_degraded_not_fatal() {
        let config = PipelineConfig::default().with_failure_policy(FailurePolicy::Halt);
        let (h, id) = harness(config).await;
        h.cache.fail_writes(true);

        let outcome = StageRunner::new(id, h.context.clone()).run().await;

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                persisted: Stage::PIPELINE.to_vec()
            }
        );
        assert!(h.cache.published_stages(id).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_outcomes() {
        let (h, id) = harness(PipelineConfig::default()).await;
        let runner = StageRunner::new(id, h.context.clone());

        assert_eq!(runner.transition(Stage::Dispatched).await, TransitionOutcome::Applied);

        h.persistence
            .fail_next_stage_write(GatewayError::Unavailable("timeout".into()));
        let degraded = runner.transition(Stage::InTransit).await;
        assert!(matches!(degraded, TransitionOutcome::Degraded { persisted: false, .. }));

        let refused = runner.transition(Stage::Delivered).await;
        assert!(matches!(refused, TransitionOutcome::Failed(GatewayError::Rejected(_))));
        assert!(!refused.persisted());
    }
}
