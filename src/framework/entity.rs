//! # ActorEntity Trait
//!
//! The `ActorEntity` trait defines the contract an entity must satisfy to be owned by a
//! [`ResourceActor`](super::ResourceActor). One actor owns one entity; the actor's mailbox is
//! the entity's critical section.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::on_start`]
//! - [`ActorEntity::on_stop`]
//!
//! You do **not** need to implement these unless you want to customize behavior.

use crate::framework::FrameworkError;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any keyed entity must implement to be managed by a `ResourceActor`.
///
/// # Async & Context
/// Hooks are `async` so they can reach external collaborators (a store, another actor).
/// The `Context` is injected into [`ResourceActor::run`](super::ResourceActor::run) rather than
/// the constructor, so dependencies are bound late.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The key this entity is addressed by.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// Enum representing entity-specific operations.
    type Action: Send + Sync + Debug;

    /// The result type returned by actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this entity.
    ///
    /// Transport failures are folded into it through `From<FrameworkError>`, so callers of a
    /// client deal with a single error type.
    type Error: std::error::Error + From<FrameworkError> + Send + Sync + 'static;

    /// The key of this entity.
    fn id(&self) -> &Self::Id;

    /// Called once before the actor starts receiving requests.
    async fn on_start(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once after the mailbox closes or a stop request arrives.
    async fn on_stop(&self, _ctx: &Self::Context) {}

    /// Handle an entity-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
