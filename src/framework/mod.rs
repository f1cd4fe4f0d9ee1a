//! Per-key actor runtime.
//!
//! This module provides the building blocks the overlay uses to give every live batch
//! its own mailbox and task, so requests for one key are processed strictly in order while
//! different keys run in parallel.
//!
//! # Main Components
//!
//! - [`ActorEntity`] - Trait that a keyed entity implements to be owned by an actor
//! - [`ResourceActor`] - Generic actor that owns exactly one entity
//! - [`ResourceClient`] - Type-safe, cloneable handle for sending requests to that actor
//! - [`ActorClient`] - Trait for domain-specific wrappers around a `ResourceClient`
//! - [`FrameworkError`] - Transport errors (closed mailbox, dropped response)
//!
//! # Testing
//!
//! See [`mock`] module for utilities to test clients without spawning full actors.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
