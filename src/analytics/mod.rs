//! Supplier performance analytics derived from durable COMPLETED orders.
//!
//! - [`aggregator`] - pure recomputation of a [`SupplierPerformance`] snapshot
//! - [`cache`] - bounded-lifetime snapshot cache, invalidated on every completion
//! - [`insight`] - text-generation collaborator fed from a snapshot's bottleneck

pub mod aggregator;
pub mod cache;
pub mod insight;

pub use aggregator::*;
pub use cache::PerformanceCache;
pub use insight::*;
