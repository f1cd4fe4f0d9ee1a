//! # Framework Errors
//!
//! Transport-level failures between a [`ResourceClient`](super::ResourceClient) and its
//! actor. Entity-level failures travel as the entity's own error type instead.

/// Errors that can occur within the actor framework itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
}
