//! # Gateway Test Doubles
//!
//! Decorators that sit in front of a real gateway, record what the pipeline
//! asked for, and inject failures on demand.
//!
//! | Double | Records | Injects |
//! |--------|---------|---------|
//! | [`MockPersistence`] | every stage write attempt, in order | queued failures for the next stage writes |
//! | [`MockCache`] | every published stage, in order | read failures, write failures |
//!
//! Clones share state, so a test keeps one handle for assertions and hands
//! another to the pipeline.
//!
//! ```rust
//! use delivery_tracker::gateway::mock::MockCache;
//! use delivery_tracker::gateway::{CacheGateway, GatewayError};
//! use delivery_tracker::model::OrderId;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = MockCache::new();
//!     cache.fail_reads(true);
//!     let result = cache.get_cancelled(OrderId(1)).await;
//!     assert!(matches!(result, Err(GatewayError::Unavailable(_))));
//! }
//! ```

use crate::gateway::{CacheGateway, GatewayError, MemoryCache, PersistenceGateway};
use crate::model::{Order, OrderId, Stage, UserId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One call to [`PersistenceGateway::update_order_stage`].
#[derive(Debug, Clone, PartialEq)]
pub struct StageWrite {
    pub order_id: OrderId,
    pub stage: Stage,
    pub result: Result<(), GatewayError>,
}

#[derive(Default)]
struct PersistenceState {
    writes: Vec<StageWrite>,
    queued_failures: VecDeque<GatewayError>,
}

/// Recording, failure-injecting wrapper around a [`PersistenceGateway`].
#[derive(Clone)]
pub struct MockPersistence {
    inner: Arc<dyn PersistenceGateway>,
    state: Arc<Mutex<PersistenceState>>,
}

impl MockPersistence {
    pub fn wrap(inner: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            inner,
            state: Arc::new(Mutex::new(PersistenceState::default())),
        }
    }

    /// The next stage write fails with `error` instead of reaching the store.
    /// Calls queue up: each one covers one write.
    pub fn fail_next_stage_write(&self, error: GatewayError) {
        self.lock().queued_failures.push_back(error);
    }

    /// Every stage write attempt, in call order.
    pub fn stage_writes(&self) -> Vec<StageWrite> {
        self.lock().writes.clone()
    }

    /// Stages successfully written for one order, in call order.
    pub fn persisted_stages(&self, order_id: OrderId) -> Vec<Stage> {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.order_id == order_id && w.result.is_ok())
            .map(|w| w.stage)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistenceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PersistenceGateway for MockPersistence {
    async fn create_order(&self, user_id: UserId, item: &str) -> Result<OrderId, GatewayError> {
        self.inner.create_order(user_id, item).await
    }

    async fn update_order_stage(
        &self,
        order_id: OrderId,
        stage: Stage,
    ) -> Result<(), GatewayError> {
        let injected = self.lock().queued_failures.pop_front();
        let result = match injected {
            Some(error) => Err(error),
            None => self.inner.update_order_stage(order_id, stage).await,
        };
        self.lock().writes.push(StageWrite {
            order_id,
            stage,
            result: result.clone(),
        });
        result
    }

    async fn get_order_owner(&self, order_id: OrderId) -> Result<UserId, GatewayError> {
        self.inner.get_order_owner(order_id).await
    }

    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError> {
        self.inner.mark_cancelled(order_id).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, GatewayError> {
        self.inner.get_order(order_id).await
    }

    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, GatewayError> {
        self.inner.list_orders(owner).await
    }
}

/// Recording, failure-injecting wrapper around a [`MemoryCache`].
#[derive(Clone, Default)]
pub struct MockCache {
    inner: MemoryCache,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    published: Arc<Mutex<Vec<(OrderId, Stage)>>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying map, for direct inspection or out-of-band writes.
    pub fn backing(&self) -> &MemoryCache {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stages successfully published for one order, in call order.
    pub fn published_stages(&self, order_id: OrderId) -> Vec<Stage> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(id, _)| *id == order_id)
            .map(|(_, stage)| *stage)
            .collect()
    }

    fn check_read(&self) -> Result<(), GatewayError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), GatewayError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheGateway for MockCache {
    async fn set_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError> {
        self.check_write()?;
        self.inner.set_cancelled(order_id).await
    }

    async fn get_cancelled(&self, order_id: OrderId) -> Result<bool, GatewayError> {
        self.check_read()?;
        self.inner.get_cancelled(order_id).await
    }

    async fn set_live_stage(&self, order_id: OrderId, stage: Stage) -> Result<(), GatewayError> {
        self.check_write()?;
        self.inner.set_live_stage(order_id, stage).await?;
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((order_id, stage));
        Ok(())
    }

    async fn get_live_stage(&self, order_id: OrderId) -> Result<Option<Stage>, GatewayError> {
        self.check_read()?;
        self.inner.get_live_stage(order_id).await
    }
}
