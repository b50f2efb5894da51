//! Local-only backend over a durable key/value store.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::mapping::{DesignRow, OrderRow};
use super::{Backend, PersistenceGateway, Subscription};
use crate::domain::{seed_catalog, Design, Order, OrderStatus};
use crate::error::GatewayError;
use crate::reconciler;

/// Key holding the serialized design catalog.
pub const DESIGNS_KEY: &str = "tailor_store_designs_v2";
/// Key holding the serialized order ledger.
pub const ORDERS_KEY: &str = "tailor_store_orders_v1";

/// String values under string keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError>;

    async fn set(&self, key: &str, value: String) -> Result<(), GatewayError>;
}

#[async_trait]
impl<K: KeyValueStore + ?Sized> KeyValueStore for Arc<K> {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), GatewayError> {
        (**self).set(key, value).await
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), GatewayError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // write-then-rename so a crash never leaves a truncated document
        let staging = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, self.path(key)).await?;
        Ok(())
    }
}

/// Process-local key/value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), GatewayError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Fallback backend: whole-sequence read-modify-write on two keys, no
/// change feed.
pub struct LocalStore<K> {
    kv: K,
    // serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_rows<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>, GatewayError> {
        match self.kv.get(key).await? {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    async fn write_rows<T: Serialize>(&self, key: &str, rows: &[T]) -> Result<(), GatewayError> {
        let document = serde_json::to_string(rows)?;
        self.kv.set(key, document).await
    }

    async fn load_designs(&self) -> Result<Vec<Design>, GatewayError> {
        match self.read_rows::<DesignRow>(DESIGNS_KEY).await? {
            Some(rows) => Ok(rows.into_iter().map(Design::from).collect()),
            None => {
                info!("No stored catalog, using seed designs");
                Ok(seed_catalog())
            }
        }
    }

    async fn load_orders(&self) -> Result<Vec<Order>, GatewayError> {
        Ok(self
            .read_rows::<OrderRow>(ORDERS_KEY)
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(Order::from)
            .collect())
    }

    async fn store_designs(&self, designs: &[Design]) -> Result<(), GatewayError> {
        let rows: Vec<DesignRow> = designs.iter().map(DesignRow::from).collect();
        self.write_rows(DESIGNS_KEY, &rows).await
    }

    async fn store_orders(&self, orders: &[Order]) -> Result<(), GatewayError> {
        let rows: Vec<OrderRow> = orders.iter().map(OrderRow::from).collect();
        self.write_rows(ORDERS_KEY, &rows).await
    }
}

#[async_trait]
impl<K: KeyValueStore> PersistenceGateway for LocalStore<K> {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn pushes_changes(&self) -> bool {
        false
    }

    async fn try_fetch_designs(&self) -> Result<Vec<Design>, GatewayError> {
        self.load_designs().await
    }

    async fn try_fetch_orders(&self) -> Result<Vec<Order>, GatewayError> {
        self.load_orders().await
    }

    #[instrument(fields(design_id = %design.id), skip(self, design))]
    async fn upsert_design(&self, design: &Design) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut designs = self.load_designs().await?;
        reconciler::upsert(&mut designs, design.clone());
        self.store_designs(&designs).await?;
        debug!(design_count = designs.len(), "Design stored");
        Ok(())
    }

    #[instrument(fields(design_id = %id), skip(self))]
    async fn remove_design(&self, id: &str) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut designs = self.load_designs().await?;
        reconciler::remove(&mut designs, id);
        self.store_designs(&designs).await?;
        debug!(design_count = designs.len(), "Design removed");
        Ok(())
    }

    #[instrument(fields(order_id = %order.id), skip(self, order))]
    async fn upsert_order(&self, order: &Order) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut orders = self.load_orders().await?;
        reconciler::upsert(&mut orders, order.clone());
        self.store_orders(&orders).await?;
        debug!(order_count = orders.len(), "Order stored");
        Ok(())
    }

    #[instrument(fields(order_id = %id, status = %status), skip(self))]
    async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut orders = self.load_orders().await?;
        match orders.iter_mut().find(|o| o.id == id) {
            Some(order) => order.status = status,
            None => warn!("No stored order to update"),
        }
        self.store_orders(&orders).await
    }

    async fn subscribe_to_designs(&self) -> Result<Subscription, GatewayError> {
        Ok(Subscription::inert("designs"))
    }

    async fn subscribe_to_orders(&self) -> Result<Subscription, GatewayError> {
        Ok(Subscription::inert("orders"))
    }
}
