//! Error types for the order store.

use crate::model::{OrderId, Stage};
use thiserror::Error;

/// Reasons the order store refuses a change.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// Orders must name an item.
    #[error("Order item must not be empty")]
    EmptyItem,

    /// The order was cancelled; no further stage may be recorded.
    #[error("Order {0} is cancelled")]
    Cancelled(OrderId),

    /// The requested stage is not the direct successor of the current one.
    #[error("Order {id}: cannot move from {current} to {requested}")]
    StageOutOfOrder {
        id: OrderId,
        current: Stage,
        requested: Stage,
    },
}
