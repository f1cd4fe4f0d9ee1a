#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use supply_tracker::clock::ManualClock;
use supply_tracker::config::TrackerConfig;
use supply_tracker::lifecycle::TrackingSystem;
use supply_tracker::model::{BatchId, Order, OrderCreate, OrderId, OrderStatus, WebhookEvent};
use supply_tracker::store::{MemoryOrderStore, OrderFilter, OrderStore, StoreError};
use tokio::sync::Notify;

pub const COFFEE_STEPS: [&str; 5] = ["Sourcing", "Processing", "Quality", "Logistics", "Delivered"];
pub const COFFEE_NOMINAL_HOURS: [i64; 5] = [24, 12, 4, 24, 8];

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 8, 0, 0).unwrap()
}

pub fn coffee(supplier_id: &str) -> OrderCreate {
    OrderCreate {
        retailer_id: "retailer-1".to_string(),
        supplier_id: supplier_id.to_string(),
        order_type: "coffee".to_string(),
        product: "Arabica Green Beans".to_string(),
        quantity: 500,
        required_by: None,
    }
}

pub fn event(batch_id: &BatchId, step: &str) -> WebhookEvent {
    WebhookEvent::new(batch_id.clone(), step, serde_json::json!({}))
}

/// Wraps the memory store, counting COMPLETED writes and failing them on demand. It can
/// also hold the next listing after its snapshot is taken until told to resume.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryOrderStore,
    pub fail_completions: AtomicBool,
    pub completed_writes: AtomicUsize,
    hold_next_list: AtomicBool,
    listed: Notify,
    resume: Notify,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_completions.store(failing, Ordering::SeqCst);
    }

    pub fn completed_writes(&self) -> usize {
        self.completed_writes.load(Ordering::SeqCst)
    }

    pub fn hold_next_list(&self) {
        self.hold_next_list.store(true, Ordering::SeqCst);
    }

    /// Waits until a held listing has taken its snapshot.
    pub async fn wait_listed(&self) {
        self.listed.notified().await;
    }

    pub fn resume_list(&self) {
        self.resume.notify_one();
    }
}

#[async_trait]
impl OrderStore for FaultyStore {
    async fn read_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.read_order(id).await
    }

    async fn write_order(&self, order: &Order) -> Result<(), StoreError> {
        if order.status == OrderStatus::Completed {
            if self.fail_completions.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected failure".into()));
            }
            self.completed_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.write_order(order).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let orders = self.inner.list_orders(filter).await?;
        if self.hold_next_list.swap(false, Ordering::SeqCst) {
            self.listed.notify_one();
            self.resume.notified().await;
        }
        Ok(orders)
    }
}

pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub clock: Arc<ManualClock>,
    pub system: TrackingSystem,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_on(FaultyStore::new(), Arc::new(ManualClock::new(t0())), TrackerConfig::default()).await
    }

    pub async fn start_on(store: Arc<FaultyStore>, clock: Arc<ManualClock>, config: TrackerConfig) -> Self {
        let system = TrackingSystem::with_store(config, store.clone(), clock.clone())
            .await
            .unwrap();
        Self { store, clock, system }
    }

    /// Stops the system and starts a fresh one on the same store and clock.
    pub async fn restart(self) -> Self {
        let Harness { store, clock, system } = self;
        system.shutdown().await;
        Self::start_on(store, clock, TrackerConfig::default()).await
    }

    /// Places and accepts a coffee order, returning its ID and batch.
    pub async fn accepted_coffee(&self, supplier_id: &str) -> (OrderId, BatchId) {
        let order = self.system.place_order(coffee(supplier_id)).await.unwrap();
        let progress = self.system.accept_order(&order.id).await.unwrap();
        (order.id, progress.batch_id)
    }

    /// Advances the clock by `hours` and then delivers the step event.
    pub async fn step_after(&self, batch_id: &BatchId, step: &str, hours: i64) {
        self.clock.advance(Duration::hours(hours));
        self.system.ingest(&event(batch_id, step)).await.unwrap();
    }
}
