//! # Gateways
//!
//! The pipeline consumes two external capabilities and never owns either:
//!
//! - [`PersistenceGateway`] - durable order records (Postgres in production,
//!   the actor-owned [`order_store`](crate::order_store) in memory).
//! - [`CacheGateway`] - shared key/value store used for cross-process
//!   cancellation flags and live stage publication (Redis in production,
//!   [`MemoryCache`] in memory).
//!
//! Both traits are object-safe so the pipeline can hold them as
//! `Arc<dyn ...>` and tests can swap in the doubles from [`mock`].
//!
//! ## Error classification
//!
//! [`GatewayError::is_retryable`] splits failures into transient ones (the
//! backend could not be reached) and fatal ones (the backend answered and
//! refused). The Stage Runner uses this to build its
//! [`TransitionOutcome`](crate::pipeline::TransitionOutcome).

pub mod memory;
pub mod mock;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryCache;

use crate::model::{Order, OrderId, Stage, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by either gateway.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// The backend could not be reached or timed out.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The backend refused the operation.
    #[error("Gateway rejected operation: {0}")]
    Rejected(String),

    /// The backend returned data that could not be interpreted.
    #[error("Gateway returned malformed data: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether trying the same call again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// Durable order records.
#[async_trait]
pub trait PersistenceGateway: Send + Sync + 'static {
    /// Create an order at [`Stage::Created`] and return its id.
    async fn create_order(&self, user_id: UserId, item: &str) -> Result<OrderId, GatewayError>;

    /// Record that an order reached `stage`.
    async fn update_order_stage(&self, order_id: OrderId, stage: Stage)
        -> Result<(), GatewayError>;

    /// The user who placed the order.
    async fn get_order_owner(&self, order_id: OrderId) -> Result<UserId, GatewayError>;

    /// Set the durable cancelled flag.
    async fn mark_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, GatewayError>;

    /// Orders of one owner, or every order when `owner` is `None`. Newest first.
    async fn list_orders(&self, owner: Option<UserId>) -> Result<Vec<Order>, GatewayError>;
}

/// Shared fast-access store.
#[async_trait]
pub trait CacheGateway: Send + Sync + 'static {
    async fn set_cancelled(&self, order_id: OrderId) -> Result<(), GatewayError>;

    async fn get_cancelled(&self, order_id: OrderId) -> Result<bool, GatewayError>;

    /// Publish the stage an order just reached, for live tracking.
    async fn set_live_stage(&self, order_id: OrderId, stage: Stage) -> Result<(), GatewayError>;

    async fn get_live_stage(&self, order_id: OrderId) -> Result<Option<Stage>, GatewayError>;
}

/// Key layout shared by every [`CacheGateway`] backend.
pub mod keys {
    use crate::model::OrderId;

    /// Value stored under [`cancelled`] once an order is cancelled.
    pub const CANCELLED_FLAG: &str = "1";

    pub fn cancelled(order_id: OrderId) -> String {
        format!("order:{}:cancelled", order_id.0)
    }

    pub fn status(order_id: OrderId) -> String {
        format!("order:{}:status", order_id.0)
    }
}
