//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run                       # lifecycle and stage events
//! RUST_LOG=debug cargo run                      # plus every cancellation check point
//! RUST_LOG=delivery_tracker::pipeline=debug cargo run
//! ```
//!
//! Every Stage Runner runs inside a `stage_runner` span carrying its
//! `order_id`, so with `RUST_LOG=info` a single order reads like:
//!
//! ```text
//! INFO place_order{user_id=user_1}: Order placed order_id=1 admission=Accepted
//! INFO stage_runner{order_id=1}: Stage recorded order_id=1 stage=dispatched
//! INFO stage_runner{order_id=1}: Stage recorded order_id=1 stage=in_transit
//! INFO stage_runner{order_id=1}: Stage recorded order_id=1 stage=delivered
//! INFO stage_runner{order_id=1}: Order delivered order_id=1 stages=3
//! ```
//!
//! Swallowed failures (queue overflow, unreadable cancel flags, failed stage
//! writes) are logged at `warn`.

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
