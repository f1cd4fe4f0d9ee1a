//! # Supply Tracker
//!
//! Tracks supply-chain orders from placement to delivery. Step-completion webhooks drive a
//! fast in-memory overlay per batch; completions are flushed to a durable order store; and
//! supplier performance (OTIF, step variance, bottlenecks) is recomputed from the durable
//! record.
//!
//! ## Core Concepts
//!
//! ### One actor per batch
//! Each live batch is owned by a [`ResourceActor`](framework::ResourceActor) running in its
//! own Tokio task. Its mailbox is the batch's critical section: lookup, ordering check,
//! step write, and completion flush for one event finish before the next event for the
//! same batch starts, while other batches proceed in parallel.
//!
//! ### Overlay versus store
//! The overlay is authoritative while an order is IN_PROGRESS. Once the COMPLETED write
//! lands, the store is authoritative and the overlay entry may be evicted. Startup
//! [`hydration`] is the only path from store back to overlay.
//!
//! ### Mocking
//! [`framework::mock`] answers a client's requests from an expectation queue, so client
//! code can be tested without spawning actors.
//!
//! ## Module Tour
//!
//! - [`framework`] - generic per-key actor runtime
//! - [`model`] - orders, the step catalog, progress state, webhook bodies
//! - [`store`] - the [`OrderStore`](store::OrderStore) interface with memory and file backends
//! - [`tracker_actor`] / [`clients`] - the batch tracker actor and its typed client
//! - [`overlay`] - the registry of live batch trackers
//! - [`hydration`] - startup reconstruction and reconciliation
//! - [`analytics`] - supplier performance, its cache, and insight generation
//! - [`lifecycle`] - [`TrackingSystem`](lifecycle::TrackingSystem) wiring and tracing setup
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod analytics;
pub mod clients;
pub mod clock;
pub mod config;
pub mod framework;
pub mod hydration;
pub mod lifecycle;
pub mod model;
pub mod overlay;
pub mod store;
pub mod tracker_actor;
