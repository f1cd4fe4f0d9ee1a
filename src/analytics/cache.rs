//! Bounded-lifetime cache of supplier snapshots.

use super::SupplierPerformance;
use crate::clock::Clock;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Snapshots keyed by supplier, each valid for `ttl` after it was computed.
///
/// A completion for a supplier drops that supplier's entry, so a cached snapshot never
/// hides a durable completion. Snapshots computed before an invalidation are refused on
/// insert through the epoch check.
pub struct PerformanceCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    epoch: AtomicU64,
    entries: RwLock<HashMap<String, SupplierPerformance>>,
}

impl PerformanceCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            epoch: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, supplier_id: &str) -> Option<SupplierPerformance> {
        let entries = self.entries.read().await;
        let entry = entries.get(supplier_id)?;
        if self.clock.now() - entry.computed_at >= self.ttl {
            debug!(supplier_id, "Cached snapshot expired");
            return None;
        }
        Some(entry.clone())
    }

    /// Read before recomputing; pass to [`insert`](Self::insert) afterwards.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Stores `snapshot` unless an invalidation happened since `epoch` was read.
    pub async fn insert(&self, snapshot: SupplierPerformance, epoch: u64) {
        if self.ttl <= Duration::zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        if self.epoch() != epoch {
            debug!(supplier_id = %snapshot.supplier_id, "Snapshot outdated before insert");
            return;
        }
        entries.insert(snapshot.supplier_id.clone(), snapshot);
    }

    pub async fn invalidate(&self, supplier_id: &str) {
        let mut entries = self.entries.write().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if entries.remove(supplier_id).is_some() {
            debug!(supplier_id, "Snapshot invalidated");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
