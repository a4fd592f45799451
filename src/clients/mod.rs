//! Typed wrappers around [`RecordClient`](crate::framework::RecordClient).

pub mod order_store_client;

pub use order_store_client::*;
