use crate::framework::{ActorClient, ResourceClient};
use crate::model::ProgressState;
use crate::tracker_actor::{BatchTracker, TrackerAction, TrackingError};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for one batch's tracker actor.
#[derive(Clone)]
pub struct TrackerClient {
    inner: ResourceClient<BatchTracker>,
}

impl TrackerClient {
    pub fn new(inner: ResourceClient<BatchTracker>) -> Self {
        Self { inner }
    }

    /// Applies a step-completion event and returns the resulting progress.
    #[instrument(skip(self, payload))]
    pub async fn apply(
        &self,
        step_name: &str,
        payload: serde_json::Value,
    ) -> Result<ProgressState, TrackingError> {
        debug!(?payload, "apply called");
        self.inner
            .perform_action(TrackerAction::Apply {
                step_name: step_name.to_string(),
                payload,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self) -> Result<ProgressState, TrackingError> {
        self.inner.perform_action(TrackerAction::Cancel).await
    }

    /// Current progress, read through the actor's mailbox.
    pub async fn snapshot(&self) -> Result<ProgressState, TrackingError> {
        Ok(self.get().await?.progress)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

#[async_trait]
impl ActorClient<BatchTracker> for TrackerClient {
    type Error = TrackingError;

    fn inner(&self) -> &ResourceClient<BatchTracker> {
        &self.inner
    }
}
