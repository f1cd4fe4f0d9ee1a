//! Error types for tracking operations.
//!
//! Two families live here. *Rejections* are client-input errors: state is unchanged and the
//! caller may retry with corrected input. *Consistency* errors (`FlushFailed`, `Store`,
//! `ActorCommunication`) mean a durable write or the actor transport failed.

use crate::framework::FrameworkError;
use crate::model::{BatchId, OrderId, OrderStatus, Rejection};
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
    /// No live or persisted record exists for the batch.
    #[error("Unknown batch: {0}")]
    UnknownBatch(BatchId),

    #[error("Unknown step '{step_name}' for batch {batch_id}")]
    UnknownStep {
        batch_id: BatchId,
        step_name: String,
        next_expected: Option<String>,
    },

    /// The step's predecessor has not completed yet.
    #[error("Step '{step_name}' is out of order for batch {batch_id}; expected '{next_expected}'")]
    OutOfOrderStep {
        batch_id: BatchId,
        step_name: String,
        next_expected: String,
    },

    #[error("Order {order_id} cannot be accepted from status {status}")]
    AlreadyAccepted {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Batch {0} is already tracked")]
    AlreadyExists(BatchId),

    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    #[error("Unknown order type: {0}")]
    UnknownOrderType(String),

    /// The batch's order is CANCELLED and takes no further events.
    #[error("Batch {batch_id} is closed ({status})")]
    OrderClosed {
        batch_id: BatchId,
        status: OrderStatus,
    },

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// All steps are complete in memory but the COMPLETED write did not land.
    #[error("Completion flush failed for batch {batch_id}: {source}")]
    FlushFailed {
        batch_id: BatchId,
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Actor communication error: {0}")]
    ActorCommunication(#[from] FrameworkError),
}

impl TrackingError {
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            TrackingError::FlushFailed { .. }
                | TrackingError::Store(_)
                | TrackingError::ActorCommunication(_)
        )
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::UnknownBatch(_) => "UNKNOWN_BATCH",
            TrackingError::UnknownStep { .. } => "UNKNOWN_STEP",
            TrackingError::OutOfOrderStep { .. } => "OUT_OF_ORDER_STEP",
            TrackingError::AlreadyAccepted { .. } => "ALREADY_ACCEPTED",
            TrackingError::AlreadyExists(_) => "ALREADY_EXISTS",
            TrackingError::UnknownOrder(_) => "UNKNOWN_ORDER",
            TrackingError::UnknownOrderType(_) => "UNKNOWN_ORDER_TYPE",
            TrackingError::OrderClosed { .. } => "ORDER_CLOSED",
            TrackingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            TrackingError::FlushFailed { .. } => "FLUSH_FAILED",
            TrackingError::Store(_) => "STORE_ERROR",
            TrackingError::ActorCommunication(_) => "ACTOR_UNAVAILABLE",
        }
    }

    pub fn next_expected_step(&self) -> Option<&str> {
        match self {
            TrackingError::UnknownStep { next_expected, .. } => next_expected.as_deref(),
            TrackingError::OutOfOrderStep { next_expected, .. } => Some(next_expected),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Rejection {
        Rejection {
            code: self.code().to_string(),
            message: self.to_string(),
            next_expected_step: self.next_expected_step().map(str::to_string),
        }
    }
}
