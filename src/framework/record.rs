//! # Record Trait
//!
//! The `Record` trait is the contract a type implements to be owned by a
//! [`RecordActor`](crate::framework::RecordActor). It names the identifier,
//! the creation payload, the patch type and the error type, and decides how
//! a patch changes the record.
//!
//! # Architecture Note
//! The actor only knows how to insert, fetch, patch and scan. Whether a patch
//! is legal (for an order: stages must advance one step at a time and never
//! after cancellation) is the record's own business, so `apply` is where the
//! domain invariants live. The actor just refuses to store a record whose
//! `apply` failed.

use std::fmt::{Debug, Display};

/// Trait that any record must implement to be managed by a `RecordActor`.
pub trait Record: Clone + Send + Sync + 'static {
    /// The unique identifier (e.g. `OrderId`).
    /// Must be convertible from u64 for automatic ID generation.
    type Id: Ord + Clone + Send + Sync + Display + Debug + From<u64>;

    /// The data required to create a new record.
    type Create: Send + Debug;

    /// A mutation applied to an existing record.
    type Patch: Send + Debug;

    /// The error type returned when creation or a patch is refused.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the full record from the generated ID and the payload.
    fn from_create(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Apply a patch in place. On error the record must be left unchanged.
    fn apply(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;
}
