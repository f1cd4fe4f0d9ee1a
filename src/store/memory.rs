//! Process-local order store.

use crate::model::{Order, OrderId};
use crate::store::{OrderFilter, OrderStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Keeps orders in a map behind a lock; a write swaps the whole record.
///
/// Cloning the `Arc` that wraps it is how tests simulate a restart: drop the tracking
/// system, keep the store, start again.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: RwLock<BTreeMap<OrderId, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn read_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn write_order(&self, order: &Order) -> Result<(), StoreError> {
        debug!(order_id = %order.id, status = %order.status, "write_order");
        self.orders
            .write()
            .await
            .insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }
}
