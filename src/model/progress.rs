//! Per-batch progress: the overlay's value type and the pure core of the ingestion
//! state machine.
//!
//! Steps fill strictly left to right. An entry never regresses from COMPLETED and its
//! completion timestamp is written once.

use crate::model::{BatchId, Order, OrderId, OrderStatus, PersistedStep, StepDefinition, SubTierLink};
use crate::tracker_actor::TrackingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    pub name: String,
    pub tier: u8,
    pub status: StepStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// Telemetry fields from the completing event, passed through uninterpreted.
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub sub_tier: Option<SubTierLink>,
}

impl StepProgress {
    fn pending(def: &StepDefinition) -> Self {
        Self {
            name: def.name.clone(),
            tier: def.tier,
            status: StepStatus::Pending,
            completed_at: None,
            payload: serde_json::Value::Null,
            sub_tier: def.sub_tier.clone(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// Where a batch sits in its `NOT_STARTED -> ... -> COMPLETE` progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InFlight { completed: usize, total: usize },
    Complete,
}

/// What an accepted event did to the progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The step was already completed; nothing changed.
    Duplicate,
    /// The step at this index was completed and more remain.
    Advanced(usize),
    /// The final step was completed.
    Finished,
}

/// How faithfully a progress state was rebuilt from a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Exact,
    /// The record carried no step log; every step starts PENDING.
    NoStepLog,
    /// Persisted completions after the first gap were discarded.
    Truncated { dropped: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub batch_id: BatchId,
    pub order_id: OrderId,
    pub supplier_id: String,
    pub order_type: String,
    pub status: OrderStatus,
    pub steps: Vec<StepProgress>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProgressState {
    /// A fresh IN_PROGRESS state with every step PENDING.
    pub fn seeded(batch_id: BatchId, order: &Order, steps: &[StepDefinition]) -> Self {
        Self {
            batch_id,
            order_id: order.id.clone(),
            supplier_id: order.supplier_id.clone(),
            order_type: order.order_type.clone(),
            status: OrderStatus::InProgress,
            steps: steps.iter().map(StepProgress::pending).collect(),
            finished_at: None,
        }
    }

    /// Rebuilds progress from a persisted order record.
    ///
    /// Recorded completions are taken left to right up to the first step without one.
    /// A COMPLETED record that only carries its aggregate status reports every step as
    /// completed at the order's finish time.
    pub fn from_order(batch_id: BatchId, order: &Order, steps: &[StepDefinition]) -> (Self, Recovery) {
        let mut state = Self::seeded(batch_id, order, steps);
        state.status = order.status;
        state.finished_at = order.finished_at;

        let Some(log) = order.step_log.as_ref() else {
            if order.status == OrderStatus::Completed {
                for step in &mut state.steps {
                    step.status = StepStatus::Completed;
                    step.completed_at = order.finished_at;
                }
            }
            return (state, Recovery::NoStepLog);
        };

        let mut gap = false;
        let mut dropped = 0;
        for step in &mut state.steps {
            match log.iter().find(|p| p.name == step.name) {
                Some(persisted) if !gap => {
                    step.status = StepStatus::Completed;
                    step.completed_at = Some(persisted.completed_at);
                    step.payload = persisted.payload.clone();
                }
                Some(_) => dropped += 1,
                None => gap = true,
            }
        }

        let recovery = if dropped > 0 {
            Recovery::Truncated { dropped }
        } else {
            Recovery::Exact
        };
        (state, recovery)
    }

    /// Validates and applies one step-completion event.
    ///
    /// Rejections leave the state untouched. A step that is already completed is accepted
    /// as a no-op.
    pub fn apply(
        &mut self,
        step_name: &str,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome, TrackingError> {
        if self.status == OrderStatus::Cancelled {
            return Err(TrackingError::OrderClosed {
                batch_id: self.batch_id.clone(),
                status: self.status,
            });
        }

        let Some(index) = self.steps.iter().position(|s| s.name == step_name) else {
            return Err(TrackingError::UnknownStep {
                batch_id: self.batch_id.clone(),
                step_name: step_name.to_string(),
                next_expected: self.next_expected().map(str::to_string),
            });
        };

        if self.steps[index].is_completed() {
            return Ok(ApplyOutcome::Duplicate);
        }

        if let Some(prev) = index.checked_sub(1) {
            if !self.steps[prev].is_completed() {
                return Err(TrackingError::OutOfOrderStep {
                    batch_id: self.batch_id.clone(),
                    step_name: step_name.to_string(),
                    next_expected: self.next_expected().unwrap_or_default().to_string(),
                });
            }
        }

        let step = &mut self.steps[index];
        step.status = StepStatus::Completed;
        step.completed_at = Some(now);
        step.payload = payload;

        if index + 1 == self.steps.len() {
            Ok(ApplyOutcome::Finished)
        } else {
            Ok(ApplyOutcome::Advanced(index))
        }
    }

    /// Records the durable COMPLETED transition.
    pub fn mark_finished(&mut self, finished_at: DateTime<Utc>) {
        self.status = OrderStatus::Completed;
        self.finished_at = Some(finished_at);
    }

    pub fn mark_cancelled(&mut self) {
        self.status = OrderStatus::Cancelled;
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(StepProgress::is_completed)
    }

    /// The first step still PENDING.
    pub fn next_expected(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| !s.is_completed())
            .map(|s| s.name.as_str())
    }

    /// Completion time of the last step, once every step is done.
    pub fn last_completion(&self) -> Option<DateTime<Utc>> {
        if self.is_complete() {
            self.steps.last().and_then(|s| s.completed_at)
        } else {
            None
        }
    }

    pub fn phase(&self) -> Phase {
        let completed = self.completed_count();
        let total = self.steps.len();
        if completed == 0 {
            Phase::NotStarted
        } else if completed == total {
            Phase::Complete
        } else {
            Phase::InFlight { completed, total }
        }
    }

    /// The completed prefix, in the shape the store persists.
    pub fn step_log(&self) -> Vec<PersistedStep> {
        self.steps
            .iter()
            .filter_map(|s| {
                s.completed_at.map(|completed_at| PersistedStep {
                    name: s.name.clone(),
                    completed_at,
                    payload: s.payload.clone(),
                })
            })
            .collect()
    }
}
