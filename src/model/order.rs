//! Orders and the payloads the order store accepts for them.
//!
//! [`Order`] implements the [`Record`](crate::framework::Record) trait, so the
//! in-memory order store manages it through a
//! [`RecordActor`](crate::framework::RecordActor). Creation takes an
//! [`OrderCreate`]; later mutations arrive as [`OrderPatch`] values.

use crate::model::{Stage, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub item: String,
    pub stage: Stage,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order at [`Stage::Created`], not cancelled.
    pub fn new(id: OrderId, user_id: UserId, item: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            item: item.into(),
            stage: Stage::Created,
            cancelled: false,
            created_at: Utc::now(),
        }
    }
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub user_id: UserId,
    pub item: String,
}

/// Mutations the order store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPatch {
    /// Record that the order reached `Stage`.
    Advance(Stage),
    /// Set the durable cancelled flag.
    Cancel,
}
