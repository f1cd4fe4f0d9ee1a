//! Actions a batch tracker accepts beyond reading its state.

/// Requests that mutate one batch's progress, all executed inside the batch's
/// critical section.
#[derive(Debug, Clone)]
pub enum TrackerAction {
    /// Apply a step-completion event.
    Apply {
        step_name: String,
        payload: serde_json::Value,
    },
    /// Close the batch and persist its order as CANCELLED.
    Cancel,
}
