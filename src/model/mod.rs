//! Pure data structures: orders, the step catalog, per-batch progress, and webhook bodies.

pub mod catalog;
pub mod event;
pub mod order;
pub mod progress;

pub use catalog::*;
pub use event::*;
pub use order::*;
pub use progress::*;
