//! Cancellation Registry: which orders have been cancelled.
//!
//! Two tiers. The local set answers for this process and is authoritative
//! once populated; the [`CacheGateway`] carries cancellations between
//! processes. A positive answer from the shared tier is copied into the local
//! set, so each order costs at most one remote hit after it is cancelled.
//! Entries are never removed.

use crate::gateway::CacheGateway;
use crate::model::OrderId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct CancellationRegistry {
    local: Mutex<HashSet<OrderId>>,
    shared: Arc<dyn CacheGateway>,
    /// Bumped whenever the local set gains an entry.
    signals: watch::Sender<u64>,
}

impl CancellationRegistry {
    pub fn new(shared: Arc<dyn CacheGateway>) -> Self {
        let (signals, _) = watch::channel(0);
        Self {
            local: Mutex::new(HashSet::new()),
            shared,
            signals,
        }
    }

    /// Marks `order_id` cancelled. Idempotent; a failed shared write is logged
    /// and otherwise ignored.
    pub async fn signal(&self, order_id: OrderId) {
        if self.insert_local(order_id) {
            info!(order_id = %order_id, "Cancellation signalled");
        }
        if let Err(e) = self.shared.set_cancelled(order_id).await {
            warn!(order_id = %order_id, error = %e, "Shared cancel flag not written");
        }
    }

    /// Local tier first, then the shared tier. Shared read failures count as
    /// "not cancelled".
    pub async fn is_cancelled(&self, order_id: OrderId) -> bool {
        if self.is_cancelled_locally(order_id) {
            return true;
        }
        match self.shared.get_cancelled(order_id).await {
            Ok(true) => {
                debug!(order_id = %order_id, "Cancellation seen in shared store");
                self.insert_local(order_id);
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Shared cancel flag unreadable, assuming not cancelled");
                false
            }
        }
    }

    pub fn is_cancelled_locally(&self, order_id: OrderId) -> bool {
        self.lock().contains(&order_id)
    }

    /// Receiver that changes every time a new order is marked cancelled
    /// locally.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.signals.subscribe()
    }

    /// Number of orders known cancelled in this process.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert_local(&self, order_id: OrderId) -> bool {
        let inserted = self.lock().insert(order_id);
        if inserted {
            self.signals.send_modify(|generation| *generation += 1);
        }
        inserted
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<OrderId>> {
        // The set stays valid even if a holder panicked
        self.local.lock().unwrap_or_else(|e| e.into_inner())
    }
}
