use crate::analytics::{
    self, InsightGenerator, InsightRequest, PerformanceCache, SupplierPerformance,
    TemplateInsightGenerator,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, StoreBackend, TrackerConfig};
use crate::hydration::{HydrationReport, HydrationService};
use crate::model::{
    BatchId, Order, OrderCreate, OrderId, OrderStatus, ProgressState, StepCatalog, WebhookEvent,
};
use crate::overlay::LiveOverlay;
use crate::store::{FileOrderStore, MemoryOrderStore, OrderFilter, OrderStore, StoreError};
use crate::tracker_actor::{TrackerContext, TrackingError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Order store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Hydration failed: {0}")]
    Hydration(#[from] TrackingError),
}

/// The runtime orchestrator: order store, live overlay, hydration, and analytics.
///
/// The overlay is authoritative for a batch while its order is IN_PROGRESS; the store is
/// authoritative once the order is COMPLETED or CANCELLED. Construction hydrates the
/// overlay before returning, so no event is ingested against a partially restored overlay.
///
/// # Example
///
/// ```ignore
/// let system = TrackingSystem::start(TrackerConfig::from_env()?).await?;
///
/// let order = system.place_order(params).await?;
/// let progress = system.accept_order(&order.id).await?;
/// system.ingest(&WebhookEvent::new(progress.batch_id.clone(), "Sourcing", json!({}))).await?;
///
/// system.shutdown().await;
/// ```
pub struct TrackingSystem {
    config: TrackerConfig,
    catalog: Arc<StepCatalog>,
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    cache: Arc<PerformanceCache>,
    overlay: Arc<LiveOverlay>,
    insight: Arc<dyn InsightGenerator>,
    /// Serializes the PENDING -> IN_PROGRESS and -> CANCELLED transitions of orders.
    transitions: Mutex<()>,
    hydration: HydrationReport,
}

impl TrackingSystem {
    /// Opens the configured store and starts the system on the wall clock.
    pub async fn start(config: TrackerConfig) -> Result<Self, StartError> {
        config.validate()?;
        let store: Arc<dyn OrderStore> = match (config.store.backend, &config.store.path) {
            (StoreBackend::File, Some(path)) => Arc::new(FileOrderStore::open(path).await?),
            (StoreBackend::File, None) => {
                return Err(ConfigError::Validation("store.path is required for the file backend".into()).into())
            }
            (StoreBackend::Memory, _) => Arc::new(MemoryOrderStore::new()),
        };
        Self::with_store(config, store, Arc::new(SystemClock)).await
    }

    /// Starts the system on an existing store and clock, hydrating the overlay first.
    pub async fn with_store(
        config: TrackerConfig,
        store: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartError> {
        let catalog = Arc::new(config.step_catalog()?);
        let ttl_secs = i64::try_from(config.analytics.cache_ttl_secs).unwrap_or(i64::MAX);
        let ttl = chrono::Duration::seconds(ttl_secs.min(i64::MAX / 1_000));
        let cache = Arc::new(PerformanceCache::new(ttl, clock.clone()));
        let context = TrackerContext {
            store: store.clone(),
            clock: clock.clone(),
            cache: cache.clone(),
            checkpoint_steps: config.persistence.checkpoint_steps,
        };
        let overlay = Arc::new(LiveOverlay::new(
            catalog.clone(),
            context,
            config.overlay.channel_buffer,
        ));

        let hydration = HydrationService::new(store.clone(), overlay.clone(), cache.clone())
            .run()
            .await?;

        info!(live = overlay.len().await, "Tracking system started");
        Ok(Self {
            config,
            catalog,
            store,
            clock,
            cache,
            overlay,
            insight: Arc::new(TemplateInsightGenerator),
            transitions: Mutex::new(()),
            hydration,
        })
    }

    pub fn with_insight_generator(mut self, generator: Arc<dyn InsightGenerator>) -> Self {
        self.insight = generator;
        self
    }

    /// The report of the startup hydration pass.
    pub fn hydration_report(&self) -> &HydrationReport {
        &self.hydration
    }

    /// Runs another hydration pass. Batches already live are left alone, and orders that
    /// complete or are cancelled while the pass runs are not brought back.
    pub async fn hydrate(&self) -> Result<HydrationReport, TrackingError> {
        HydrationService::new(self.store.clone(), self.overlay.clone(), self.cache.clone())
            .run()
            .await
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn overlay(&self) -> &LiveOverlay {
        &self.overlay
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Creates a PENDING order.
    #[instrument(skip(self, params), fields(supplier_id = %params.supplier_id))]
    pub async fn place_order(&self, params: OrderCreate) -> Result<Order, TrackingError> {
        debug!(?params, "place_order called");
        if self.catalog.steps(&params.order_type).is_none() {
            return Err(TrackingError::UnknownOrderType(params.order_type));
        }
        let order = Order::place(OrderId::generate(), params, self.clock.now());
        self.store.write_order(&order).await?;
        info!(order_id = %order.id, supplier_id = %order.supplier_id, "Order placed");
        Ok(order)
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, TrackingError> {
        self.store
            .read_order(order_id)
            .await?
            .ok_or_else(|| TrackingError::UnknownOrder(order_id.clone()))
    }

    /// Supplier acceptance: assigns a batch, moves the order to IN_PROGRESS, and seeds the
    /// overlay with every step PENDING.
    #[instrument(skip(self))]
    pub async fn accept_order(&self, order_id: &OrderId) -> Result<ProgressState, TrackingError> {
        let _guard = self.transitions.lock().await;
        let mut order = self.get_order(order_id).await?;

        let batch_id = BatchId::generate();
        order
            .accept(batch_id.clone(), self.clock.now())
            .map_err(|status| TrackingError::AlreadyAccepted {
                order_id: order_id.clone(),
                status,
            })?;

        let progress = self.overlay.seed(batch_id.clone(), &order).await?;
        if let Err(e) = self.store.write_order(&order).await {
            self.overlay.remove(&batch_id).await;
            return Err(e.into());
        }

        info!(%order_id, %batch_id, "Order accepted");
        Ok(progress)
    }

    /// Moves a PENDING or IN_PROGRESS order to CANCELLED.
    ///
    /// A live batch is cancelled through its tracker, so the cancel cannot interleave with
    /// an event for the same batch.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, TrackingError> {
        let _guard = self.transitions.lock().await;
        let mut order = self.get_order(order_id).await?;

        let mut live_batch = None;
        if let (Some(batch_id), OrderStatus::InProgress) = (&order.batch_id, order.status) {
            if self.overlay.contains(batch_id).await {
                live_batch = Some(batch_id.clone());
            }
        }

        match live_batch {
            Some(batch_id) => {
                self.overlay.cancel(&batch_id).await?;
                self.overlay.remove(&batch_id).await;
                order = self.get_order(order_id).await?;
            }
            None => {
                order
                    .cancel(self.clock.now())
                    .map_err(|from| TrackingError::InvalidTransition {
                        order_id: order_id.clone(),
                        from,
                        to: OrderStatus::Cancelled,
                    })?;
                self.store.write_order(&order).await?;
                info!(%order_id, "Order cancelled");
            }
        }
        Ok(order)
    }

    /// Applies one webhook event and returns the batch's resulting progress.
    ///
    /// A result with status COMPLETED means the order store already holds the completion.
    #[instrument(skip(self, event), fields(batch_id = %event.batch_id, step = %event.step_name))]
    pub async fn ingest(&self, event: &WebhookEvent) -> Result<ProgressState, TrackingError> {
        let result = self
            .overlay
            .apply(&event.batch_id, &event.step_name, event.payload.clone())
            .await;

        match result {
            Ok(progress) => {
                if progress.status == OrderStatus::Completed && self.config.overlay.evict_on_completion {
                    self.overlay.remove(&event.batch_id).await;
                }
                Ok(progress)
            }
            // The batch left the overlay, possibly while this event was in flight.
            Err(TrackingError::UnknownBatch(_)) | Err(TrackingError::ActorCommunication(_)) => {
                self.replay_against_store(event).await
            }
            Err(e) => {
                if e.is_rejection() {
                    warn!(code = e.code(), error = %e, "Event rejected");
                }
                Err(e)
            }
        }
    }

    /// Answers an event for a batch that is no longer live from the durable record.
    async fn replay_against_store(&self, event: &WebhookEvent) -> Result<ProgressState, TrackingError> {
        let unknown = || TrackingError::UnknownBatch(event.batch_id.clone());
        let order = self
            .store
            .find_by_batch(&event.batch_id)
            .await?
            .ok_or_else(unknown)?;

        let progress = self.terminal_snapshot(&event.batch_id, &order)?;
        match order.status {
            OrderStatus::Completed => {
                if self.catalog.position(&order.order_type, &event.step_name).is_none() {
                    return Err(TrackingError::UnknownStep {
                        batch_id: event.batch_id.clone(),
                        step_name: event.step_name.clone(),
                        next_expected: None,
                    });
                }
                debug!("Replayed event for completed order ignored");
                Ok(progress)
            }
            status if status.is_terminal() => Err(TrackingError::OrderClosed {
                batch_id: event.batch_id.clone(),
                status,
            }),
            _ => Err(unknown()),
        }
    }

    fn terminal_snapshot(&self, batch_id: &BatchId, order: &Order) -> Result<ProgressState, TrackingError> {
        let steps = self
            .catalog
            .steps(&order.order_type)
            .ok_or_else(|| TrackingError::UnknownOrderType(order.order_type.clone()))?;
        Ok(ProgressState::from_order(batch_id.clone(), order, steps).0)
    }

    /// Tracker read: the live progress, or a snapshot derived from the store once the batch
    /// has left the overlay.
    pub async fn tracker(&self, batch_id: &BatchId) -> Result<ProgressState, TrackingError> {
        match self.overlay.get(batch_id).await {
            Ok(progress) => Ok(progress),
            Err(TrackingError::UnknownBatch(_)) | Err(TrackingError::ActorCommunication(_)) => {
                let order = self
                    .store
                    .find_by_batch(batch_id)
                    .await?
                    .ok_or_else(|| TrackingError::UnknownBatch(batch_id.clone()))?;
                self.terminal_snapshot(batch_id, &order)
            }
            Err(e) => Err(e),
        }
    }

    /// The supplier's performance over its COMPLETED orders. Zero-state when it has none.
    #[instrument(skip(self))]
    pub async fn supplier_performance(&self, supplier_id: &str) -> Result<SupplierPerformance, TrackingError> {
        if let Some(cached) = self.cache.get(supplier_id).await {
            debug!("Serving cached snapshot");
            return Ok(cached);
        }

        let epoch = self.cache.epoch();
        let filter = OrderFilter::default()
            .with_status(OrderStatus::Completed)
            .with_supplier(supplier_id);
        let orders = self.store.list_orders(&filter).await?;
        let snapshot = analytics::compute(
            supplier_id,
            &orders,
            &self.catalog,
            self.config.analytics.bottleneck_limit,
            self.clock.now(),
        );
        self.cache.insert(snapshot.clone(), epoch).await;
        Ok(snapshot)
    }

    /// Performance across every supplier's COMPLETED orders, reported under
    /// [`analytics::FLEET_SCOPE`]. Always recomputed.
    #[instrument(skip(self))]
    pub async fn fleet_performance(&self) -> Result<SupplierPerformance, TrackingError> {
        let filter = OrderFilter::default().with_status(OrderStatus::Completed);
        let orders = self.store.list_orders(&filter).await?;
        Ok(analytics::compute_fleet(
            &orders,
            &self.catalog,
            self.config.analytics.bottleneck_limit,
            self.clock.now(),
        ))
    }

    /// Prose about the supplier's main delay. Generator failures come back as text.
    #[instrument(skip(self))]
    pub async fn supplier_insight(&self, supplier_id: &str) -> Result<String, TrackingError> {
        let snapshot = self.supplier_performance(supplier_id).await?;
        let Some(request) = InsightRequest::from_snapshot(&snapshot) else {
            return Ok("No data available.".to_string());
        };
        match self.insight.generate(&request).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(error = %e, "Insight generation failed");
                Ok(format!("Insight unavailable: {e}"))
            }
        }
    }

    /// Stops every live tracker. Returns how many were running.
    pub async fn shutdown(self) -> usize {
        info!("Shutting down tracking system...");
        let stopped = self.overlay.shutdown().await;
        info!(stopped, "Shutdown complete");
        stopped
    }
}
