mod common;

use chrono::Duration;
use common::*;
use std::sync::Arc;
use supply_tracker::clock::{ManualClock, SystemClock};
use supply_tracker::config::TrackerConfig;
use supply_tracker::lifecycle::TrackingSystem;
use supply_tracker::model::{
    BatchId, Order, OrderId, OrderStatus, PersistedStep, StepStatus,
};
use supply_tracker::store::{FileOrderStore, OrderStore};

/// An IN_PROGRESS coffee order on batch `B-{id}` whose log holds the given steps.
fn in_progress(id: &str, steps: &[&str]) -> Order {
    let mut order = Order::place(OrderId::from(id), coffee("supplier-1"), t0());
    order
        .accept(BatchId::from(format!("B-{id}").as_str()), t0())
        .unwrap();
    order.step_log = Some(
        steps
            .iter()
            .enumerate()
            .map(|(i, name)| PersistedStep {
                name: name.to_string(),
                completed_at: t0() + Duration::hours(i as i64 + 1),
                payload: serde_json::json!({ "seq": i }),
            })
            .collect(),
    );
    order
}

async fn seeded_store(orders: &[Order]) -> Arc<FaultyStore> {
    let store = FaultyStore::new();
    for order in orders {
        store.write_order(order).await.unwrap();
    }
    store
}

async fn start(store: Arc<FaultyStore>) -> Harness {
    Harness::start_on(store, Arc::new(ManualClock::new(t0())), TrackerConfig::default()).await
}

#[tokio::test]
async fn test_round_trip_reproduces_persisted_steps() {
    let orders: Vec<Order> = (0..5)
        .map(|n| in_progress(&format!("ORD-{n}"), &COFFEE_STEPS[..n]))
        .collect();
    let h = start(seeded_store(&orders).await).await;

    let report = h.system.hydration_report();
    assert_eq!(report.scanned, 5);
    assert_eq!(report.restored, 5);
    assert_eq!(report.degraded, 0);
    assert_eq!(report.reconciled, 0);

    for (n, order) in orders.iter().enumerate() {
        let batch = order.batch_id.clone().unwrap();
        let progress = h.system.tracker(&batch).await.unwrap();
        assert_eq!(progress.completed_count(), n);
        for (i, step) in progress.steps.iter().enumerate() {
            if i < n {
                assert_eq!(step.completed_at, Some(t0() + Duration::hours(i as i64 + 1)));
                assert_eq!(step.payload["seq"], i);
            } else {
                assert_eq!(step.status, StepStatus::Pending);
                assert!(step.completed_at.is_none());
            }
        }
    }
}

#[tokio::test]
async fn test_only_in_progress_orders_are_hydrated() {
    let pending = Order::place(OrderId::from("ORD-P"), coffee("supplier-1"), t0());
    let mut cancelled = in_progress("ORD-C", &COFFEE_STEPS[..1]);
    cancelled.cancel(t0()).unwrap();
    let live = in_progress("ORD-L", &COFFEE_STEPS[..1]);

    let h = start(seeded_store(&[pending, cancelled, live]).await).await;
    assert_eq!(h.system.hydration_report().scanned, 1);
    assert_eq!(h.system.overlay().batch_ids().await, vec![BatchId::from("B-ORD-L")]);
}

#[tokio::test]
async fn test_degraded_recoveries_are_counted() {
    let mut no_log = in_progress("ORD-1", &[]);
    no_log.step_log = None;
    let gap = in_progress("ORD-2", &["Sourcing", "Quality", "Logistics"]);

    let h = start(seeded_store(&[no_log, gap]).await).await;
    let report = h.system.hydration_report();
    assert_eq!(report.restored, 2);
    assert_eq!(report.degraded, 2);

    let fresh = h.system.tracker(&BatchId::from("B-ORD-1")).await.unwrap();
    assert_eq!(fresh.completed_count(), 0);

    let truncated = h.system.tracker(&BatchId::from("B-ORD-2")).await.unwrap();
    assert_eq!(truncated.completed_count(), 1);
    assert_eq!(truncated.next_expected(), Some("Processing"));
}

#[tokio::test]
async fn test_hydration_is_idempotent() {
    let orders = vec![
        in_progress("ORD-1", &COFFEE_STEPS[..2]),
        in_progress("ORD-2", &COFFEE_STEPS[..3]),
    ];
    let h = start(seeded_store(&orders).await).await;
    let before = h.system.tracker(&BatchId::from("B-ORD-1")).await.unwrap();

    let again = h.system.hydrate().await.unwrap();
    assert_eq!(again.restored, 0);
    assert_eq!(again.already_present, 2);
    assert_eq!(h.system.overlay().len().await, 2);
    assert_eq!(h.system.tracker(&BatchId::from("B-ORD-1")).await.unwrap(), before);
}

#[tokio::test]
async fn test_batch_finished_during_pass_stays_finished() {
    let Harness { store, clock, system } = Harness::start().await;
    let system = Arc::new(system);
    let order = system.place_order(coffee("supplier-1")).await.unwrap();
    let batch = system.accept_order(&order.id).await.unwrap().batch_id;
    for step in &COFFEE_STEPS[..4] {
        clock.advance(Duration::hours(1));
        system.ingest(&event(&batch, step)).await.unwrap();
    }

    store.hold_next_list();
    let pass = tokio::spawn({
        let system = system.clone();
        async move { system.hydrate().await }
    });
    store.wait_listed().await;

    // The listing above still shows the order IN_PROGRESS with four steps done.
    clock.advance(Duration::hours(1));
    let done = system.ingest(&event(&batch, "Delivered")).await.unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert!(!system.overlay().contains(&batch).await);

    store.resume_list();
    let report = pass.await.unwrap().unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.restored, 0);
    assert_eq!(report.superseded, 1);

    assert!(!system.overlay().contains(&batch).await);
    let progress = system.tracker(&batch).await.unwrap();
    assert_eq!(progress.status, OrderStatus::Completed);
    assert_eq!(progress.completed_count(), 5);
    assert_eq!(store.completed_writes(), 1);
}

#[tokio::test]
async fn test_complete_log_is_reconciled() {
    let order = in_progress("ORD-1", &COFFEE_STEPS);
    let h = start(seeded_store(&[order]).await).await;

    let report = h.system.hydration_report();
    assert_eq!(report.reconciled, 1);
    assert_eq!(report.restored, 0);
    assert!(h.system.overlay().is_empty().await);

    let stored = h.system.get_order(&OrderId::from("ORD-1")).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.finished_at, Some(t0() + Duration::hours(5)));
    assert_eq!(h.store.completed_writes(), 1);

    let perf = h.system.supplier_performance("supplier-1").await.unwrap();
    assert_eq!(perf.completed_orders, 1);
}

#[tokio::test]
async fn test_failed_reconciliation_keeps_batch_live() {
    let store = seeded_store(&[in_progress("ORD-1", &COFFEE_STEPS)]).await;
    store.set_failing(true);
    let h = start(store).await;

    let report = h.system.hydration_report();
    assert_eq!(report.reconciled, 0);
    assert_eq!(report.restored, 1);

    h.store.set_failing(false);
    let batch = BatchId::from("B-ORD-1");
    let done = h.system.ingest(&event(&batch, "Delivered")).await.unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert_eq!(done.finished_at, Some(t0() + Duration::hours(5)));
}

#[tokio::test]
async fn test_file_store_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileOrderStore::open(dir.path()).await.unwrap());

    let system = TrackingSystem::with_store(TrackerConfig::default(), store.clone(), Arc::new(SystemClock))
        .await
        .unwrap();
    let order = system.place_order(coffee("supplier-1")).await.unwrap();
    let batch = system.accept_order(&order.id).await.unwrap().batch_id;
    system.ingest(&event(&batch, "Sourcing")).await.unwrap();
    system.ingest(&event(&batch, "Processing")).await.unwrap();
    system.shutdown().await;
    drop(store);

    let reopened = Arc::new(FileOrderStore::open(dir.path()).await.unwrap());
    let system = TrackingSystem::with_store(TrackerConfig::default(), reopened, Arc::new(SystemClock))
        .await
        .unwrap();
    assert_eq!(system.hydration_report().restored, 1);

    let progress = system.tracker(&batch).await.unwrap();
    assert_eq!(progress.completed_count(), 2);
    assert_eq!(progress.next_expected(), Some("Quality"));
}
