//! [`ActorEntity`] implementation for a single batch's progress.
//!
//! Each live batch is owned by its own actor, so everything in
//! [`BatchTracker::handle_action`] runs as one critical section per batch: the lookup,
//! ordering check, step write, and completion flush cannot interleave with another event
//! for the same batch, while other batches proceed in parallel.

use super::{TrackerAction, TrackingError};
use crate::analytics::PerformanceCache;
use crate::clock::Clock;
use crate::framework::ActorEntity;
use crate::model::{ApplyOutcome, BatchId, OrderStatus, ProgressState};
use crate::store::{OrderStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Dependencies injected into every batch actor.
#[derive(Clone)]
pub struct TrackerContext {
    pub store: Arc<dyn OrderStore>,
    pub clock: Arc<dyn Clock>,
    pub cache: Arc<PerformanceCache>,
    /// Write the step log after every accepted intermediate step.
    pub checkpoint_steps: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchTracker {
    pub progress: ProgressState,
    /// Every step is complete in memory but the COMPLETED write has not landed.
    pub flush_pending: bool,
}

impl BatchTracker {
    /// A state that is fully complete but still IN_PROGRESS starts with its flush pending.
    pub fn new(progress: ProgressState) -> Self {
        let flush_pending = progress.status == OrderStatus::InProgress && progress.is_complete();
        Self {
            progress,
            flush_pending,
        }
    }

    async fn flush(&mut self, ctx: &TrackerContext) -> Result<(), TrackingError> {
        let finished_at = self
            .progress
            .last_completion()
            .unwrap_or_else(|| ctx.clock.now());

        match persist_completion(ctx.store.as_ref(), &self.progress, finished_at).await {
            Ok(finished_at) => {
                self.progress.mark_finished(finished_at);
                self.flush_pending = false;
                ctx.cache.invalidate(&self.progress.supplier_id).await;
                info!(
                    batch_id = %self.progress.batch_id,
                    order_id = %self.progress.order_id,
                    %finished_at,
                    "Order completed"
                );
                Ok(())
            }
            Err(e) => {
                error!(batch_id = %self.progress.batch_id, error = %e, "Completion flush failed");
                Err(e)
            }
        }
    }

    async fn checkpoint(&self, ctx: &TrackerContext) {
        if let Err(e) = write_step_log(ctx.store.as_ref(), &self.progress).await {
            warn!(batch_id = %self.progress.batch_id, error = %e, "Step checkpoint failed");
        }
    }

    async fn cancel(&mut self, ctx: &TrackerContext) -> Result<(), TrackingError> {
        let order_id = self.progress.order_id.clone();
        if self.flush_pending {
            return Err(TrackingError::InvalidTransition {
                order_id,
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
            });
        }
        let mut order = ctx
            .store
            .read_order(&order_id)
            .await?
            .ok_or_else(|| StoreError::MissingRecord(order_id.clone()))?;

        order
            .cancel(ctx.clock.now())
            .map_err(|from| TrackingError::InvalidTransition {
                order_id: order_id.clone(),
                from,
                to: OrderStatus::Cancelled,
            })?;
        order.step_log = Some(self.progress.step_log());
        ctx.store.write_order(&order).await?;

        self.progress.mark_cancelled();
        self.flush_pending = false;
        info!(batch_id = %self.progress.batch_id, %order_id, "Order cancelled");
        Ok(())
    }
}

/// Persists the completed prefix of an IN_PROGRESS order.
async fn write_step_log(store: &dyn OrderStore, progress: &ProgressState) -> Result<(), StoreError> {
    let mut order = store
        .read_order(&progress.order_id)
        .await?
        .ok_or_else(|| StoreError::MissingRecord(progress.order_id.clone()))?;
    if order.status != OrderStatus::InProgress {
        return Ok(());
    }
    order.step_log = Some(progress.step_log());
    store.write_order(&order).await
}

/// Writes the COMPLETED transition (status, finish time, full step log) in one record write.
///
/// An order that is already COMPLETED is left alone and its recorded finish time returned,
/// so the finish timestamp is set exactly once.
pub(crate) async fn persist_completion(
    store: &dyn OrderStore,
    progress: &ProgressState,
    finished_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, TrackingError> {
    let flush_failed = |source: StoreError| TrackingError::FlushFailed {
        batch_id: progress.batch_id.clone(),
        source,
    };

    let mut order = store
        .read_order(&progress.order_id)
        .await
        .map_err(flush_failed)?
        .ok_or_else(|| flush_failed(StoreError::MissingRecord(progress.order_id.clone())))?;

    if order.status == OrderStatus::Completed {
        return Ok(order.finished_at.unwrap_or(finished_at));
    }

    order
        .complete(progress.step_log(), finished_at)
        .map_err(|from| TrackingError::InvalidTransition {
            order_id: order.id.clone(),
            from,
            to: OrderStatus::Completed,
        })?;
    store.write_order(&order).await.map_err(flush_failed)?;
    Ok(finished_at)
}

#[async_trait]
impl ActorEntity for BatchTracker {
    type Id = BatchId;
    type Action = TrackerAction;
    type ActionResult = ProgressState;
    type Context = TrackerContext;
    type Error = TrackingError;

    fn id(&self) -> &BatchId {
        &self.progress.batch_id
    }

    async fn on_start(&mut self, _ctx: &TrackerContext) -> Result<(), TrackingError> {
        debug!(
            batch_id = %self.progress.batch_id,
            completed = self.progress.completed_count(),
            total = self.progress.steps.len(),
            "Tracking batch"
        );
        Ok(())
    }

    async fn on_stop(&self, ctx: &TrackerContext) {
        if !self.flush_pending {
            return;
        }
        let Some(finished_at) = self.progress.last_completion() else {
            return;
        };
        match persist_completion(ctx.store.as_ref(), &self.progress, finished_at).await {
            Ok(_) => {
                ctx.cache.invalidate(&self.progress.supplier_id).await;
                info!(batch_id = %self.progress.batch_id, "Pending completion flushed on stop");
            }
            Err(e) => warn!(
                batch_id = %self.progress.batch_id,
                error = %e,
                "Tracker stopped with completion flush pending; hydration will reconcile"
            ),
        }
    }

    async fn handle_action(
        &mut self,
        action: TrackerAction,
        ctx: &TrackerContext,
    ) -> Result<ProgressState, TrackingError> {
        match action {
            TrackerAction::Apply { step_name, payload } => {
                let outcome = self.progress.apply(&step_name, payload, ctx.clock.now())?;
                match outcome {
                    ApplyOutcome::Duplicate => {
                        debug!(batch_id = %self.progress.batch_id, step = %step_name, "Duplicate event ignored");
                        if self.flush_pending {
                            self.flush(ctx).await?;
                        }
                    }
                    ApplyOutcome::Advanced(index) => {
                        info!(batch_id = %self.progress.batch_id, step = %step_name, index, "Step completed");
                        if ctx.checkpoint_steps {
                            self.checkpoint(ctx).await;
                        }
                    }
                    ApplyOutcome::Finished => {
                        info!(batch_id = %self.progress.batch_id, step = %step_name, "Final step completed");
                        self.flush_pending = true;
                        if let Err(e) = self.flush(ctx).await {
                            // Leaves the full log behind for hydration to reconcile.
                            self.checkpoint(ctx).await;
                            return Err(e);
                        }
                    }
                }
            }
            TrackerAction::Cancel => self.cancel(ctx).await?,
        }
        Ok(self.progress.clone())
    }
}
