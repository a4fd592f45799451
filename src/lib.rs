//! # Delivery Tracker
//!
//! > **Order fulfillment as a pipeline of cancellable per-order tasks.**
//!
//! Customers place orders; each order moves through `dispatched`,
//! `in_transit` and `delivered`, one stage per delay; the owner or an admin
//! may cancel it at any point before it is delivered.
//!
//! ## Core Concepts
//!
//! ### Admission and dispatch
//! A newly created order is handed to a bounded [`AdmissionQueue`](pipeline::AdmissionQueue).
//! Admission never blocks: a full queue drops the id and the order simply
//! stays at `created`. A single [`Dispatcher`](pipeline::Dispatcher) drains
//! the queue and spawns one [`StageRunner`](pipeline::StageRunner) per order.
//!
//! ### Cooperative cancellation
//! Cancelling sets a flag in the [`CancellationRegistry`](pipeline::CancellationRegistry),
//! which keeps an in-process set and mirrors it to a shared cache so other
//! processes see it too. Runners check the registry before and after every
//! stage delay; nothing is ever interrupted mid-write.
//!
//! ### Best-effort writes
//! A runner never retries. Failed reads of the cancel flag count as "not
//! cancelled"; failed stage writes are logged and, under the default
//! [`FailurePolicy`](config::FailurePolicy), the runner moves on.
//!
//! ## Module Tour
//!
//! ### 1. The Pipeline ([`pipeline`])
//! Queue, dispatcher, runners and the cancellation registry, all owned by a
//! [`PipelineContext`](pipeline::PipelineContext).
//!
//! ### 2. The Gateways ([`gateway`])
//! The two external capabilities the pipeline consumes:
//! [`PersistenceGateway`](gateway::PersistenceGateway) and
//! [`CacheGateway`](gateway::CacheGateway), with in-memory, Redis
//! (feature `redis`), Postgres (feature `postgres`) and mock backends.
//!
//! ### 3. The Order Store ([`framework`], [`order_store`], [`clients`])
//! The in-memory persistence backend: a generic record actor, the order
//! rules it enforces, and the client that adapts it to the gateway trait.
//!
//! ### 4. The Desk ([`desk`])
//! Place, cancel (with ownership checks), list and track orders.
//!
//! ### 5. The Orchestrator ([`lifecycle`])
//! [`DeliverySystem`](lifecycle::DeliverySystem) wires everything together;
//! [`setup_tracing`](lifecycle::setup_tracing) installs logging.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=info cargo run
//! DELIVERY_STAGE_DELAY_MS=500 RUST_LOG=debug cargo run
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod desk;
pub mod framework;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod order_store;
pub mod pipeline;
