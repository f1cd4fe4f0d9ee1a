//! Demo: one coffee order from placement to delivery, then the supplier's numbers.

use serde_json::json;
use supply_tracker::config::TrackerConfig;
use supply_tracker::lifecycle::{setup_tracing, TrackingSystem};
use supply_tracker::model::{OrderCreate, WebhookEvent};
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = TrackerConfig::from_env()?;
    let system = TrackingSystem::start(config).await?;
    info!(report = ?system.hydration_report(), "System ready");

    let order = system
        .place_order(OrderCreate {
            retailer_id: "retailer-1".to_string(),
            supplier_id: "supplier-1".to_string(),
            order_type: "coffee".to_string(),
            product: "Arabica Green Beans".to_string(),
            quantity: 500,
            required_by: None,
        })
        .await?;

    let progress = system.accept_order(&order.id).await?;
    let batch_id = progress.batch_id.clone();

    let span = tracing::info_span!("webhooks", %batch_id);
    async {
        // Arrives before its predecessors and is turned away.
        let early = WebhookEvent::new(batch_id.clone(), "Quality", json!({}));
        if let Err(e) = system.ingest(&early).await {
            let rejection = e.rejection();
            warn!(code = %rejection.code, next = ?rejection.next_expected_step, "Rejected");
        }

        for step in ["Sourcing", "Sourcing", "Processing", "Quality", "Logistics", "Delivered"] {
            let event = WebhookEvent::new(batch_id.clone(), step, json!({ "source": "demo" }));
            let progress = system.ingest(&event).await?;
            info!(step, completed = progress.completed_count(), status = %progress.status, "Event applied");
        }
        Ok::<_, supply_tracker::tracker_actor::TrackingError>(())
    }
    .instrument(span)
    .await?;

    let stored = system.get_order(&order.id).await?;
    info!(status = %stored.status, finished_at = ?stored.finished_at, "Order record");

    let performance = system.supplier_performance("supplier-1").await?;
    info!(
        otif_pct = performance.otif_pct,
        bottleneck = ?performance.bottleneck,
        "Supplier performance"
    );
    info!(insight = %system.supplier_insight("supplier-1").await?, "Supplier insight");

    let fleet = system.fleet_performance().await?;
    info!(
        completed = fleet.completed_orders,
        avg_variance_hours = fleet.avg_variance_hours,
        otif_pct = fleet.otif_pct,
        "Fleet performance"
    );

    system.shutdown().await;
    Ok(())
}
