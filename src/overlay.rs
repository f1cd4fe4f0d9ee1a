//! Live Tracking Overlay: the registry of per-batch tracker actors.
//!
//! The registry lock only guards the map. It is held to find, insert, or take out a
//! tracker and never across a request to one, so events for different batches run in
//! parallel while each batch's own actor serializes its events.

use crate::clients::TrackerClient;
use crate::framework::ActorClient;
use crate::model::{BatchId, Order, OrderId, OrderStatus, ProgressState, Recovery, StepCatalog};
use crate::store::OrderStore;
use crate::tracker_actor::{self, BatchTracker, TrackerContext, TrackingError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Result of [`LiveOverlay::restore_current`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    /// Rebuilt from the current record and now live.
    Live(Recovery),
    /// The batch was already live.
    AlreadyLive,
    /// The record is gone, no longer IN_PROGRESS, or moved to another batch.
    Superseded(Option<OrderStatus>),
}

struct Slot {
    client: TrackerClient,
    handle: JoinHandle<BatchTracker>,
}

pub struct LiveOverlay {
    catalog: Arc<StepCatalog>,
    context: TrackerContext,
    channel_buffer: usize,
    trackers: RwLock<HashMap<BatchId, Slot>>,
}

impl LiveOverlay {
    pub fn new(catalog: Arc<StepCatalog>, context: TrackerContext, channel_buffer: usize) -> Self {
        Self {
            catalog,
            context,
            channel_buffer: channel_buffer.max(1),
            trackers: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// The tracker client for `batch_id`, if the batch is live.
    pub async fn client(&self, batch_id: &BatchId) -> Option<TrackerClient> {
        self.trackers
            .read()
            .await
            .get(batch_id)
            .map(|slot| slot.client.clone())
    }

    async fn require(&self, batch_id: &BatchId) -> Result<TrackerClient, TrackingError> {
        self.client(batch_id)
            .await
            .ok_or_else(|| TrackingError::UnknownBatch(batch_id.clone()))
    }

    /// Current progress of a live batch.
    pub async fn get(&self, batch_id: &BatchId) -> Result<ProgressState, TrackingError> {
        self.require(batch_id).await?.snapshot().await
    }

    /// Starts tracking a freshly accepted order with every step PENDING.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn seed(&self, batch_id: BatchId, order: &Order) -> Result<ProgressState, TrackingError> {
        let steps = self
            .catalog
            .steps(&order.order_type)
            .ok_or_else(|| TrackingError::UnknownOrderType(order.order_type.clone()))?;
        let progress = ProgressState::seeded(batch_id, order, steps);
        self.insert(progress.clone()).await?;
        info!(batch_id = %progress.batch_id, steps = progress.steps.len(), "Batch seeded");
        Ok(progress)
    }

    /// Restores `batch_id` from the order's current store record.
    ///
    /// The record is read while the registry is write-locked. Trackers write their terminal
    /// status before they are evicted, so a batch that completed or was cancelled since the
    /// caller listed it is seen as such here and never comes back live.
    #[instrument(skip(self, store))]
    pub async fn restore_current(
        &self,
        store: &dyn OrderStore,
        order_id: &OrderId,
        batch_id: &BatchId,
    ) -> Result<Restored, TrackingError> {
        let mut trackers = self.trackers.write().await;
        if trackers.contains_key(batch_id) {
            return Ok(Restored::AlreadyLive);
        }

        let order = match store.read_order(order_id).await? {
            Some(order)
                if order.status == OrderStatus::InProgress && order.batch_id.as_ref() == Some(batch_id) =>
            {
                order
            }
            other => return Ok(Restored::Superseded(other.map(|o| o.status))),
        };
        let steps = self
            .catalog
            .steps(&order.order_type)
            .ok_or_else(|| TrackingError::UnknownOrderType(order.order_type.clone()))?;

        let (progress, recovery) = ProgressState::from_order(batch_id.clone(), &order, steps);
        let completed = progress.completed_count();
        self.spawn_into(&mut trackers, progress);
        debug!(%batch_id, completed, "Batch restored");
        Ok(Restored::Live(recovery))
    }

    async fn insert(&self, progress: ProgressState) -> Result<(), TrackingError> {
        let mut trackers = self.trackers.write().await;
        if trackers.contains_key(&progress.batch_id) {
            return Err(TrackingError::AlreadyExists(progress.batch_id));
        }
        self.spawn_into(&mut trackers, progress);
        Ok(())
    }

    fn spawn_into(&self, trackers: &mut HashMap<BatchId, Slot>, progress: ProgressState) {
        let batch_id = progress.batch_id.clone();
        let (actor, client) = tracker_actor::new(BatchTracker::new(progress), self.channel_buffer);
        let handle = tokio::spawn(actor.run(self.context.clone()));
        trackers.insert(batch_id, Slot { client, handle });
    }

    /// Applies one step-completion event to a live batch.
    pub async fn apply(
        &self,
        batch_id: &BatchId,
        step_name: &str,
        payload: serde_json::Value,
    ) -> Result<ProgressState, TrackingError> {
        self.require(batch_id).await?.apply(step_name, payload).await
    }

    /// Cancels a live batch inside its critical section.
    pub async fn cancel(&self, batch_id: &BatchId) -> Result<ProgressState, TrackingError> {
        self.require(batch_id).await?.cancel().await
    }

    /// Stops and forgets a batch, returning its final progress.
    ///
    /// Events already queued ahead of the stop are processed first. `None` when the batch
    /// was not live or its task failed.
    pub async fn remove(&self, batch_id: &BatchId) -> Option<ProgressState> {
        let slot = self.trackers.write().await.remove(batch_id)?;
        Self::stop_slot(batch_id, slot).await
    }

    async fn stop_slot(batch_id: &BatchId, slot: Slot) -> Option<ProgressState> {
        let stopped = slot.client.stop().await;
        drop(slot.client);
        match (stopped, slot.handle.await) {
            (_, Ok(tracker)) => Some(tracker.progress),
            (Ok(tracker), Err(e)) => {
                error!(%batch_id, error = %e, "Tracker task failed after stop");
                Some(tracker.progress)
            }
            (Err(_), Err(e)) => {
                error!(%batch_id, error = %e, "Tracker task failed");
                None
            }
        }
    }

    pub async fn contains(&self, batch_id: &BatchId) -> bool {
        self.trackers.read().await.contains_key(batch_id)
    }

    pub async fn len(&self) -> usize {
        self.trackers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trackers.read().await.is_empty()
    }

    pub async fn batch_ids(&self) -> Vec<BatchId> {
        let mut ids: Vec<BatchId> = self.trackers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stops every tracker. Returns how many were running.
    pub async fn shutdown(&self) -> usize {
        let slots: Vec<(BatchId, Slot)> = self.trackers.write().await.drain().collect();
        let count = slots.len();
        for (batch_id, slot) in slots {
            Self::stop_slot(&batch_id, slot).await;
        }
        info!(count, "Overlay shut down");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::PerformanceCache;
    use crate::clock::{Clock, ManualClock};
    use crate::model::{OrderCreate, OrderId, OrderStatus, StepStatus};
    use crate::store::{MemoryOrderStore, OrderStore};
    use chrono::{Duration, TimeZone, Utc};

    async fn setup() -> (Arc<MemoryOrderStore>, LiveOverlay, Order) {
        let store = Arc::new(MemoryOrderStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 10, 1, 8, 0, 0).unwrap(),
        ));
        let context = TrackerContext {
            store: store.clone(),
            clock: clock.clone(),
            cache: Arc::new(PerformanceCache::new(Duration::seconds(60), clock.clone())),
            checkpoint_steps: true,
        };
        let overlay = LiveOverlay::new(Arc::new(StepCatalog::default()), context, 8);

        let mut order = Order::place(
            OrderId::from("ORD-1"),
            OrderCreate {
                retailer_id: "retailer-1".into(),
                supplier_id: "supplier-1".into(),
                order_type: "coffee".into(),
                product: "Arabica".into(),
                quantity: 10,
                required_by: None,
            },
            clock.now(),
        );
        order.accept(BatchId::from("B1"), clock.now()).unwrap();
        store.write_order(&order).await.unwrap();
        (store, overlay, order)
    }

    #[tokio::test]
    async fn test_seed_and_get() {
        let (_store, overlay, order) = setup().await;
        let seeded = overlay.seed(BatchId::from("B1"), &order).await.unwrap();
        assert_eq!(seeded.steps.len(), 5);
        assert!(seeded.steps.iter().all(|s| s.status == StepStatus::Pending));

        assert_eq!(overlay.get(&BatchId::from("B1")).await.unwrap(), seeded);
        assert!(overlay.contains(&BatchId::from("B1")).await);
        assert_eq!(overlay.len().await, 1);
    }

    #[tokio::test]
    async fn test_seed_twice_is_rejected() {
        let (_store, overlay, order) = setup().await;
        overlay.seed(BatchId::from("B1"), &order).await.unwrap();
        let err = overlay.seed(BatchId::from("B1"), &order).await.unwrap_err();
        assert!(matches!(err, TrackingError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_unknown_order_type() {
        let (_store, overlay, mut order) = setup().await;
        order.order_type = "tea".into();
        let err = overlay.seed(BatchId::from("B1"), &order).await.unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_ORDER_TYPE");
        assert!(overlay.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let (_store, overlay, _order) = setup().await;
        let err = overlay
            .apply(&BatchId::from("B9"), "Sourcing", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_BATCH");
        assert!(overlay.get(&BatchId::from("B9")).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_checkpoints_and_rejects_out_of_order() {
        let (store, overlay, order) = setup().await;
        let batch = BatchId::from("B1");
        overlay.seed(batch.clone(), &order).await.unwrap();

        let err = overlay
            .apply(&batch, "Quality", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.next_expected_step(), Some("Sourcing"));

        let progress = overlay
            .apply(&batch, "Sourcing", serde_json::json!({ "lot": "A7" }))
            .await
            .unwrap();
        assert_eq!(progress.completed_count(), 1);

        let persisted = store.read_order(&order.id).await.unwrap().unwrap();
        assert_eq!(persisted.status, OrderStatus::InProgress);
        assert_eq!(persisted.step_log.unwrap()[0].payload["lot"], "A7");
    }

    #[tokio::test]
    async fn test_remove_returns_final_progress() {
        let (_store, overlay, order) = setup().await;
        let batch = BatchId::from("B1");
        overlay.seed(batch.clone(), &order).await.unwrap();
        overlay
            .apply(&batch, "Sourcing", serde_json::Value::Null)
            .await
            .unwrap();

        let last = overlay.remove(&batch).await.unwrap();
        assert_eq!(last.completed_count(), 1);
        assert!(overlay.remove(&batch).await.is_none());
        assert!(!overlay.contains(&batch).await);
    }

    #[tokio::test]
    async fn test_restore_current_reads_latest_record() {
        let (store, overlay, mut order) = setup().await;
        let batch = BatchId::from("B1");

        let restored = overlay.restore_current(store.as_ref(), &order.id, &batch).await.unwrap();
        assert_eq!(restored, Restored::Live(Recovery::Exact));
        let again = overlay.restore_current(store.as_ref(), &order.id, &batch).await.unwrap();
        assert_eq!(again, Restored::AlreadyLive);
        overlay.remove(&batch).await.unwrap();

        order.cancel(order.placed_at).unwrap();
        store.write_order(&order).await.unwrap();
        let closed = overlay.restore_current(store.as_ref(), &order.id, &batch).await.unwrap();
        assert_eq!(closed, Restored::Superseded(Some(OrderStatus::Cancelled)));
        assert!(!overlay.contains(&batch).await);

        let missing = overlay
            .restore_current(store.as_ref(), &OrderId::from("ORD-9"), &batch)
            .await
            .unwrap();
        assert_eq!(missing, Restored::Superseded(None));
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let (store, overlay, order) = setup().await;
        overlay.seed(BatchId::from("B1"), &order).await.unwrap();

        let mut other = order.clone();
        other.id = OrderId::from("ORD-2");
        other.batch_id = Some(BatchId::from("B2"));
        store.write_order(&other).await.unwrap();
        overlay.seed(BatchId::from("B2"), &other).await.unwrap();

        assert_eq!(overlay.batch_ids().await, vec![BatchId::from("B1"), BatchId::from("B2")]);
        assert_eq!(overlay.shutdown().await, 2);
        assert!(overlay.is_empty().await);
    }
}
