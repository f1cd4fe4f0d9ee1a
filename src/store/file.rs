//! File-backed order store: one JSON document per order.

use crate::model::{Order, OrderId};
use crate::store::{OrderFilter, OrderStore, StoreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stores each order as `<dir>/<hex of order id>.json`.
///
/// A write goes to a uniquely named temporary file in the same directory, is synced to
/// disk, and is then renamed over the record, so a crash mid-write leaves the previous
/// record intact.
#[derive(Debug, Clone)]
pub struct FileOrderStore {
    dir: PathBuf,
}

impl FileOrderStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        info!(path = %dir.display(), "Opened file order store");
        Ok(Self { dir })
    }

    fn record_path(&self, id: &OrderId) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(id.0.as_bytes())))
    }

    async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl OrderStore for FileOrderStore {
    async fn read_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        match fs::read(self.record_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_order(&self, order: &Order) -> Result<(), StoreError> {
        let path = self.record_path(&order.id);
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));
        let bytes = serde_json::to_vec_pretty(order)?;

        if let Err(e) = Self::write_synced(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(order_id = %order.id, status = %order.status, "write_order");
        Ok(())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut orders = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Order>(&bytes) {
                Ok(order) if filter.matches(&order) => orders.push(order),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable order record")
                }
            }
        }
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }
}
