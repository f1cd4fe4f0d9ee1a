//! # Generic Messages
//!
//! Message types exchanged between a `ResourceClient` and its `ResourceActor`.

use crate::framework::ActorEntity;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T, E> = oneshot::Sender<Result<T, E>>;

/// Internal message type sent to the actor.
///
/// - **Get**: Returns a clone of the current entity state.
/// - **Action**: Executes an [`ActorEntity::Action`] against the entity.
/// - **Stop**: Ends the actor loop and returns the final entity state.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Get {
        respond_to: oneshot::Sender<T>,
    },
    Action {
        action: T::Action,
        respond_to: Response<T::ActionResult, T::Error>,
    },
    Stop {
        respond_to: oneshot::Sender<T>,
    },
}
