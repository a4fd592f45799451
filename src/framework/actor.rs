//! # Record Actor
//!
//! The "server" half of the record store: one Tokio task that owns every
//! record of a type and processes requests one at a time.

use crate::framework::client::RecordClient;
use crate::framework::error::StoreError;
use crate::framework::message::StoreRequest;
use crate::framework::record::Record;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic actor that owns a collection of records.
///
/// **Concurrency Model**:
/// Many Stage Runners may write to the same store at once. They never touch
/// the map directly; their requests queue up on the channel and the actor
/// applies them sequentially, so the `store` needs no `Mutex`.
///
/// # Usage Pattern
///
/// 1.  **Create**: `RecordActor::new()` returns the actor and its client.
/// 2.  **Run**: spawn `actor.run()` in a background task.
/// 3.  **Use**: clone the client wherever access is needed. The actor exits
///     once every client has been dropped.
pub struct RecordActor<T: Record> {
    receiver: mpsc::Receiver<StoreRequest<T>>,
    store: BTreeMap<T::Id, T>,
    next_id: u64,
}

impl<T: Record> RecordActor<T> {
    /// Creates a new `RecordActor` and its associated `RecordClient`.
    ///
    /// `buffer_size` is the capacity of the request channel; when it is full,
    /// client calls wait for space.
    pub fn new(buffer_size: usize) -> (Self, RecordClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: BTreeMap::new(),
            next_id: 1,
        };
        (actor, RecordClient::new(sender))
    }

    /// Runs the actor's event loop until the channel closes.
    pub async fn run(mut self) {
        // Just the type name (e.g. "Order" instead of "delivery_tracker::model::order::Order")
        let record_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(record_type, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { params, respond_to } => {
                    debug!(record_type, ?params, "Insert");
                    let id = T::Id::from(self.next_id);
                    match T::from_create(id.clone(), params) {
                        Ok(record) => {
                            self.next_id += 1;
                            self.store.insert(id.clone(), record);
                            info!(record_type, %id, size = self.store.len(), "Inserted");
                            let _ = respond_to.send(Ok(id));
                        }
                        Err(e) => {
                            warn!(record_type, error = %e, "Insert rejected");
                            let _ = respond_to.send(Err(StoreError::Rejected(Box::new(e))));
                        }
                    }
                }
                StoreRequest::Fetch { id, respond_to } => {
                    let record = self.store.get(&id).cloned();
                    debug!(record_type, %id, found = record.is_some(), "Fetch");
                    let _ = respond_to.send(Ok(record));
                }
                StoreRequest::Patch {
                    id,
                    patch,
                    respond_to,
                } => {
                    debug!(record_type, %id, ?patch, "Patch");
                    let Some(record) = self.store.get_mut(&id) else {
                        warn!(record_type, %id, "Not found");
                        let _ = respond_to.send(Err(StoreError::NotFound(id.to_string())));
                        continue;
                    };
                    match record.apply(patch) {
                        Ok(()) => {
                            debug!(record_type, %id, "Patched");
                            let _ = respond_to.send(Ok(record.clone()));
                        }
                        Err(e) => {
                            warn!(record_type, %id, error = %e, "Patch rejected");
                            let _ = respond_to.send(Err(StoreError::Rejected(Box::new(e))));
                        }
                    }
                }
                StoreRequest::Scan { filter, respond_to } => {
                    let matches: Vec<T> = self
                        .store
                        .values()
                        .rev()
                        .filter(|record| filter(record))
                        .cloned()
                        .collect();
                    debug!(record_type, count = matches.len(), "Scan");
                    let _ = respond_to.send(Ok(matches));
                }
            }
        }

        info!(record_type, size = self.store.len(), "Store shutdown");
    }
}
