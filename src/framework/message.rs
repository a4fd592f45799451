//! # Store Messages
//!
//! Requests a [`RecordClient`](crate::framework::RecordClient) sends to its
//! [`RecordActor`](crate::framework::RecordActor). Each carries a oneshot
//! sender for the reply.

use crate::framework::error::StoreError;
use crate::framework::record::Record;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the store actor.
pub type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// Predicate used by [`StoreRequest::Scan`].
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Message type sent to the actor.
///
/// - **Insert**: build a record from [`Record::Create`] under a fresh ID.
/// - **Fetch**: read one record by ID.
/// - **Patch**: apply a [`Record::Patch`] and return the new state.
/// - **Scan**: every record matching a predicate, newest ID first.
pub enum StoreRequest<T: Record> {
    Insert {
        params: T::Create,
        respond_to: Reply<T::Id>,
    },
    Fetch {
        id: T::Id,
        respond_to: Reply<Option<T>>,
    },
    Patch {
        id: T::Id,
        patch: T::Patch,
        respond_to: Reply<T>,
    },
    Scan {
        filter: Filter<T>,
        respond_to: Reply<Vec<T>>,
    },
}
