//! Startup reconstruction of the overlay from the order store.
//!
//! Every IN_PROGRESS order gets its progress rebuilt from its persisted step log. Orders
//! whose log already covers every step are flushed to COMPLETED instead of being tracked.

use crate::analytics::PerformanceCache;
use crate::model::{BatchId, OrderId, OrderStatus, ProgressState, Recovery};
use crate::overlay::{LiveOverlay, Restored};
use crate::store::{OrderFilter, OrderStore};
use crate::tracker_actor::{entity::persist_completion, TrackingError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one hydration pass did. Each scanned order lands in exactly one of `restored`,
/// `already_present`, `reconciled`, `superseded`, or `failed`; `degraded` overlaps them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrationReport {
    pub scanned: usize,
    pub restored: usize,
    pub already_present: usize,
    /// Rebuilt without a usable step log, or with completions dropped after a gap.
    pub degraded: usize,
    /// Complete in the store's step log but not yet COMPLETED; flushed now.
    pub reconciled: usize,
    /// Left IN_PROGRESS between the listing and the restore.
    pub superseded: usize,
    pub failed: usize,
}

pub struct HydrationService {
    store: Arc<dyn OrderStore>,
    overlay: Arc<LiveOverlay>,
    cache: Arc<PerformanceCache>,
}

impl HydrationService {
    pub fn new(store: Arc<dyn OrderStore>, overlay: Arc<LiveOverlay>, cache: Arc<PerformanceCache>) -> Self {
        Self {
            store,
            overlay,
            cache,
        }
    }

    /// Runs one pass. Only adds batches that are not live yet, so repeated runs converge.
    ///
    /// Safe while events flow: each order is re-read under the overlay's registry lock
    /// before it is restored, so a batch finished after the listing stays finished.
    pub async fn run(&self) -> Result<HydrationReport, TrackingError> {
        let filter = OrderFilter::default().with_status(OrderStatus::InProgress);
        let orders = self.store.list_orders(&filter).await?;
        let mut report = HydrationReport {
            scanned: orders.len(),
            ..Default::default()
        };

        for order in orders {
            let Some(batch_id) = order.batch_id.clone() else {
                warn!(order_id = %order.id, "IN_PROGRESS order has no batch; skipped");
                report.failed += 1;
                continue;
            };

            if self.overlay.contains(&batch_id).await {
                report.already_present += 1;
                continue;
            }

            let Some(steps) = self.overlay.catalog().steps(&order.order_type) else {
                warn!(order_id = %order.id, order_type = %order.order_type, "Unknown order type; skipped");
                report.failed += 1;
                continue;
            };

            let (progress, recovery) = ProgressState::from_order(batch_id.clone(), &order, steps);
            if let Some(finished_at) = progress.last_completion() {
                match persist_completion(self.store.as_ref(), &progress, finished_at).await {
                    Ok(finished_at) => {
                        info!(%batch_id, order_id = %order.id, %finished_at, "Reconciled unflushed completion");
                        self.cache.invalidate(&order.supplier_id).await;
                        note_recovery(&mut report, &batch_id, &order.id, recovery);
                        report.reconciled += 1;
                        continue;
                    }
                    Err(e) => {
                        // Keep it live with the flush pending so a re-delivered final event retries.
                        error!(%batch_id, error = %e, "Reconciliation flush failed");
                    }
                }
            }

            match self.overlay.restore_current(self.store.as_ref(), &order.id, &batch_id).await {
                Ok(Restored::Live(recovery)) => {
                    note_recovery(&mut report, &batch_id, &order.id, recovery);
                    report.restored += 1;
                }
                Ok(Restored::AlreadyLive) => report.already_present += 1,
                Ok(Restored::Superseded(status)) => {
                    debug!(%batch_id, order_id = %order.id, ?status, "Order left IN_PROGRESS during the pass");
                    report.superseded += 1;
                }
                Err(e) => {
                    error!(%batch_id, error = %e, "Restore failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            restored = report.restored,
            already_present = report.already_present,
            degraded = report.degraded,
            reconciled = report.reconciled,
            superseded = report.superseded,
            failed = report.failed,
            "Hydration finished"
        );
        Ok(report)
    }
}

fn note_recovery(report: &mut HydrationReport, batch_id: &BatchId, order_id: &OrderId, recovery: Recovery) {
    match recovery {
        Recovery::Exact => {}
        Recovery::NoStepLog => {
            warn!(%batch_id, %order_id, "No step log persisted; every step restarts PENDING");
            report.degraded += 1;
        }
        Recovery::Truncated { dropped } => {
            warn!(%batch_id, %order_id, dropped, "Persisted steps after a gap discarded");
            report.degraded += 1;
        }
    }
}
