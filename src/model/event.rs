//! Inbound webhook body and the structured rejection returned for it.

use crate::model::BatchId;
use serde::{Deserialize, Serialize};

/// A step-completion event from the external ERP or simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub batch_id: BatchId,
    pub step_name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WebhookEvent {
    pub fn new(batch_id: BatchId, step_name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            batch_id,
            step_name: step_name.into(),
            payload,
        }
    }
}

/// Body returned for a rejected event, so a well-behaved source can resend in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_expected_step: Option<String>,
}
