//! Supply-chain orders as held by the Persistent Order Store.
//!
//! The record is written whole (last writer wins), so every field that must survive a
//! restart lives here, including the step log used by hydration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        Self(format!("ORD-{}", Uuid::new_v4().simple()))
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type-safe identifier for a live tracking session, assigned on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn generate() -> Self {
        Self(format!("BATCH-{}", Uuid::new_v4().simple()))
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// COMPLETED and CANCELLED are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (Pending, Cancelled) | (InProgress, Completed) | (InProgress, Cancelled)
        )
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// A durably recorded step completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedStep {
    pub name: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub retailer_id: String,
    pub supplier_id: String,
    pub order_type: String,
    pub product: String,
    pub quantity: u32,
    #[serde(default)]
    pub required_by: Option<NaiveDate>,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Completed steps in catalog order. `None` marks a record that only carries the
    /// aggregate status, which hydration treats as a degraded recovery.
    #[serde(default)]
    pub step_log: Option<Vec<PersistedStep>>,
}

/// Payload for placing a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub retailer_id: String,
    pub supplier_id: String,
    pub order_type: String,
    pub product: String,
    pub quantity: u32,
    #[serde(default)]
    pub required_by: Option<NaiveDate>,
}

impl Order {
    /// Creates a PENDING order.
    pub fn place(id: OrderId, params: OrderCreate, placed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            retailer_id: params.retailer_id,
            supplier_id: params.supplier_id,
            order_type: params.order_type,
            product: params.product,
            quantity: params.quantity,
            required_by: params.required_by,
            placed_at,
            status: OrderStatus::Pending,
            batch_id: None,
            accepted_at: None,
            finished_at: None,
            cancelled_at: None,
            step_log: None,
        }
    }

    /// PENDING -> IN_PROGRESS, binding the batch ID for good.
    ///
    /// Returns the status that blocked the transition on failure.
    pub fn accept(&mut self, batch_id: BatchId, at: DateTime<Utc>) -> Result<(), OrderStatus> {
        if self.status != OrderStatus::Pending || self.batch_id.is_some() {
            return Err(self.status);
        }
        self.status = OrderStatus::InProgress;
        self.batch_id = Some(batch_id);
        self.accepted_at = Some(at);
        self.step_log = Some(Vec::new());
        Ok(())
    }

    /// IN_PROGRESS -> COMPLETED with the full step log and finish timestamp.
    pub fn complete(
        &mut self,
        step_log: Vec<PersistedStep>,
        finished_at: DateTime<Utc>,
    ) -> Result<(), OrderStatus> {
        if !self.status.can_transition_to(OrderStatus::Completed) {
            return Err(self.status);
        }
        self.status = OrderStatus::Completed;
        self.step_log = Some(step_log);
        self.finished_at = Some(finished_at);
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), OrderStatus> {
        if !self.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(self.status);
        }
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(at);
        Ok(())
    }

    /// Completion time of a persisted step, if recorded.
    pub fn completed_at(&self, step_name: &str) -> Option<DateTime<Utc>> {
        self.step_log
            .as_ref()?
            .iter()
            .find(|s| s.name == step_name)
            .map(|s| s.completed_at)
    }
}
