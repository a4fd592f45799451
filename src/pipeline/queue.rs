//! Admission Queue: bounded FIFO of order ids waiting for a Stage Runner.

use crate::model::OrderId;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// What happened to an enqueue call.
///
/// Purely informational: a dropped order is not an error and callers are free
/// to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The queue was full; the order stays at its initial stage.
    Dropped,
}

/// Producer half. Shared by every caller of `enqueue`.
pub struct AdmissionQueue {
    sender: mpsc::Sender<OrderId>,
    dropped: AtomicU64,
}

/// Consumer half, owned by the Dispatcher.
pub struct AdmissionReceiver {
    receiver: mpsc::Receiver<OrderId>,
}

/// Creates a queue holding at most `capacity` pending ids (at least one).
pub fn admission_queue(capacity: usize) -> (AdmissionQueue, AdmissionReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        AdmissionQueue {
            sender,
            dropped: AtomicU64::new(0),
        },
        AdmissionReceiver { receiver },
    )
}

impl AdmissionQueue {
    /// Never blocks. A full queue drops the id.
    pub fn enqueue(&self, order_id: OrderId) -> Admission {
        match self.sender.try_send(order_id) {
            Ok(()) => {
                debug!(order_id = %order_id, "Admitted");
                Admission::Accepted
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(order_id = %order_id, dropped, "Admission queue full, order dropped");
                Admission::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(order_id = %order_id, dropped, "Dispatcher gone, order dropped");
                Admission::Dropped
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Entries enqueued but not yet taken by the Dispatcher.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Total ids dropped since the queue was created.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AdmissionReceiver {
    /// Waits for the next id. Returns `None` once `shutdown` reads `true` (or
    /// its sender is gone), even if entries are still pending.
    pub async fn dequeue(&mut self, shutdown: &mut watch::Receiver<bool>) -> Option<OrderId> {
        if *shutdown.borrow() {
            return None;
        }
        tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => None,
            id = self.receiver.recv() => id,
        }
    }
}
