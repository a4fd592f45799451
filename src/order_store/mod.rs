//! # Order Store
//!
//! The in-memory durable record store for orders: a
//! [`RecordActor<Order>`](crate::framework::RecordActor) plus the
//! [`Record`](crate::framework::Record) rules in [`entity`].
//!
//! Wrap the returned client in
//! [`OrderStoreClient`](crate::clients::OrderStoreClient) to use it as a
//! [`PersistenceGateway`](crate::gateway::PersistenceGateway).
//!
//! ```rust
//! use delivery_tracker::clients::OrderStoreClient;
//! use delivery_tracker::gateway::PersistenceGateway;
//! use delivery_tracker::model::{Stage, UserId};
//! use delivery_tracker::order_store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (actor, client) = order_store::new();
//!     tokio::spawn(actor.run());
//!     let store = OrderStoreClient::new(client);
//!
//!     let id = store.create_order(UserId(1), "widget").await?;
//!     store.update_order_stage(id, Stage::Dispatched).await?;
//!     assert_eq!(store.get_order_owner(id).await?, UserId(1));
//!     Ok(())
//! }
//! ```

pub mod entity;
pub mod error;

pub use error::*;

use crate::framework::{RecordActor, RecordClient};
use crate::model::Order;

/// Request buffer for the order store actor.
const STORE_BUFFER: usize = 256;

/// Creates a new order store actor and its client.
pub fn new() -> (RecordActor<Order>, RecordClient<Order>) {
    RecordActor::new(STORE_BUFFER)
}
