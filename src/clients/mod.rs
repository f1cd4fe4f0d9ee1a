//! Type-safe wrappers around [`ResourceClient`](crate::framework::ResourceClient).

pub mod tracker_client;

pub use tracker_client::*;
