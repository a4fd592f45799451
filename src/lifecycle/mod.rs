//! # System Lifecycle
//!
//! Wiring and teardown for a complete delivery system.
//!
//! - [`DeliverySystem`] - spawns the order store (or takes external gateways),
//!   starts the pipeline and exposes the [`OrderDesk`](crate::desk::OrderDesk)
//! - [`setup_tracing`] - installs the process-wide log subscriber

pub mod delivery_system;
pub mod tracing;

pub use delivery_system::*;
pub use self::tracing::*;
