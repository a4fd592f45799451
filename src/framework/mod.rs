//! Generic actor-owned record store.
//!
//! The in-memory Persistence Gateway is built on these pieces:
//!
//! - [`Record`] - Trait that stored types implement; owns the domain invariants
//! - [`RecordActor`] - One task owning every record of a type
//! - [`RecordClient`] - Cloneable, typed handle that sends requests to the actor
//! - [`StoreError`] - Plumbing errors plus wrapped record rejections

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod record;

pub use actor::RecordActor;
pub use client::RecordClient;
pub use error::StoreError;
pub use message::{Filter, Reply, StoreRequest};
pub use record::Record;
