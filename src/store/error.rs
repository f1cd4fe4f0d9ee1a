//! Error types for the Persistent Order Store.

use crate::model::OrderId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order record missing: {0}")]
    MissingRecord(OrderId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
