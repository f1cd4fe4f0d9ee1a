//! System wiring and process-level setup.

pub mod tracing;
pub mod tracking_system;

pub use self::tracing::setup_tracing;
pub use tracking_system::*;
