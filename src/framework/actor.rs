//! # Generic Actor Server
//!
//! This module defines the `ResourceActor`, the "server" half of the actor pair. It owns one
//! entity and processes its requests sequentially, which makes the mailbox the entity's only
//! critical section.

use crate::framework::{ActorEntity, ResourceClient, ResourceRequest};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic actor that owns a single entity.
///
/// **Concurrency Model**:
/// Each `ResourceActor` runs in its own Tokio task and handles one request at a time, so the
/// entity needs no `Mutex`. Thousands of actors can run side by side; requests for different
/// keys never wait on each other.
///
/// # Usage Pattern
///
/// 1.  **Create**: `ResourceActor::new(entity, buffer)` returns the actor and its client.
/// 2.  **Wire**: Pass dependencies into `actor.run(context)`.
/// 3.  **Run**: Spawn the run loop in a background task.
///
/// The loop ends when every client clone has been dropped or a `Stop` request arrives; it
/// returns the final entity state either way.
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    entity: T,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` owning `entity`, and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the mailbox capacity; senders wait when it is full.
    pub fn new(entity: T, buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self { receiver, entity };
        (actor, ResourceClient::new(sender))
    }

    /// Runs the actor's event loop until the channel closes or a stop is requested.
    pub async fn run(mut self, context: T::Context) -> T {
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        let id = self.entity.id().clone();

        if let Err(e) = self.entity.on_start(&context).await {
            warn!(entity_type, %id, error = %e, "on_start failed");
            return self.entity;
        }
        info!(entity_type, %id, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Get { respond_to } => {
                    debug!(entity_type, %id, "Get");
                    let _ = respond_to.send(self.entity.clone());
                }
                ResourceRequest::Action { action, respond_to } => {
                    debug!(entity_type, %id, ?action, "Action");
                    let result = self.entity.handle_action(action, &context).await;
                    match &result {
                        Ok(_) => debug!(entity_type, %id, "Action ok"),
                        Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
                    }
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Stop { respond_to } => {
                    debug!(entity_type, %id, "Stop");
                    self.receiver.close();
                    self.entity.on_stop(&context).await;
                    info!(entity_type, %id, "Shutdown");
                    let _ = respond_to.send(self.entity.clone());
                    return self.entity;
                }
            }
        }

        self.entity.on_stop(&context).await;
        info!(entity_type, %id, "Shutdown");
        self.entity
    }
}
