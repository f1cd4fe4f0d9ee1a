//! # Persistent Order Store
//!
//! The durable, key-addressed record of orders. Implementations guarantee that a single
//! `write_order` replaces the whole record atomically: readers see either the old record or
//! the new one, never a mix of status and timestamps.
//!
//! - [`MemoryOrderStore`] - process-local map, used by tests and the demo
//! - [`FileOrderStore`] - one JSON document per order, replaced via rename

pub mod error;
pub mod file;
pub mod memory;

pub use error::*;
pub use file::FileOrderStore;
pub use memory::MemoryOrderStore;

use crate::model::{BatchId, Order, OrderId, OrderStatus};
use async_trait::async_trait;

/// Selects orders in [`OrderStore::list_orders`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub supplier_id: Option<String>,
    pub batch_id: Option<BatchId>,
}

impl OrderFilter {
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_supplier(mut self, supplier_id: impl Into<String>) -> Self {
        self.supplier_id = Some(supplier_id.into());
        self
    }

    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self
                .supplier_id
                .as_ref()
                .map_or(true, |s| &order.supplier_id == s)
            && self
                .batch_id
                .as_ref()
                .map_or(true, |b| order.batch_id.as_ref() == Some(b))
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn read_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Replaces the whole record; last writer wins.
    async fn write_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Matching orders, sorted by order ID.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// The order bound to `batch_id`, if any.
    async fn find_by_batch(&self, batch_id: &BatchId) -> Result<Option<Order>, StoreError> {
        let filter = OrderFilter::default().with_batch(batch_id.clone());
        Ok(self.list_orders(&filter).await?.into_iter().next())
    }
}
