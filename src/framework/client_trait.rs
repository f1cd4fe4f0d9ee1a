//! # ActorClient Trait
//!
//! Common interface for entity-specific clients, adding default `get` and `stop` methods on
//! top of a generic `ResourceClient`.

use crate::framework::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for entity-specific clients to inherit the standard operations.
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The entity-specific error type.
    type Error: From<FrameworkError> + Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Fetch the current entity state.
    #[tracing::instrument(skip(self))]
    async fn get(&self) -> Result<T, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get().await.map_err(Self::Error::from)
    }

    /// Stop the actor and return its final state.
    #[tracing::instrument(skip(self))]
    async fn stop(&self) -> Result<T, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().stop().await.map_err(Self::Error::from)
    }
}
