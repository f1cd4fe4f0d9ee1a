//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG`. Module paths are hidden (`with_target(false)`); log lines carry structured
//! fields such as `batch_id`, `order_id`, and `step` instead.
//!
//! ## What Gets Traced
//!
//! - **Tracker lifecycle**: each batch actor's start and shutdown
//! - **Ingestion**: accepted steps at `info`, duplicates and raw actions at `debug`,
//!   rejections at `warn`
//! - **Durability**: completion flushes at `info`, failed flushes at `error`, failed
//!   checkpoints at `warn`
//! - **Hydration**: one summary line per pass, plus a `warn` for every degraded recovery
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle and completions only
//! RUST_LOG=info cargo run
//!
//! # Every mailbox request, including event payloads
//! RUST_LOG=debug cargo run
//!
//! # Only the ingestion path
//! RUST_LOG=supply_tracker::tracker_actor=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` the coffee scenario reads:
//!
//! ```text
//! INFO Order placed order_id=ORD-... supplier_id="supplier-1"
//! INFO Actor started entity_type="BatchTracker" id=BATCH-...
//! INFO Step completed batch_id=BATCH-... step=Sourcing index=0
//! INFO Final step completed batch_id=BATCH-... step=Delivered
//! INFO Order completed batch_id=BATCH-... order_id=ORD-... finished_at=...
//! ```

/// Installs the global subscriber. Call once, at process start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
