//! # Batch Tracker Actor
//!
//! One actor per live batch. It applies webhook events to the batch's progress under the
//! ordering and idempotence rules, and writes the COMPLETED transition to the order store
//! before answering the event that finished the batch.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](crate::framework::ActorEntity) implementation for [`BatchTracker`]
//! - [`error`] - [`TrackingError`], shared by every tracking operation
//! - [`actions`] - [`TrackerAction`]
//! - [`new()`] - Factory function that creates the actor and client

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::{BatchTracker, TrackerContext};
pub use error::*;

use crate::clients::TrackerClient;
use crate::framework::ResourceActor;

/// Creates a tracker actor owning `tracker`, and its client.
pub fn new(tracker: BatchTracker, buffer_size: usize) -> (ResourceActor<BatchTracker>, TrackerClient) {
    let (actor, generic_client) = ResourceActor::new(tracker, buffer_size);
    (actor, TrackerClient::new(generic_client))
}
