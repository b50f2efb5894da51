//! Remote backend over a hosted table store with a change feed.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use super::mapping::{DesignRow, OrderRow};
use super::{Backend, PersistenceGateway, Subscription};
use crate::domain::{Design, Order, OrderStatus};
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Designs,
    Orders,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Designs => "designs",
            Table::Orders => "orders",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            Table::Designs => "design",
            Table::Orders => "order",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row ordering requested from `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: &'static str,
    pub descending: bool,
}

impl SortOrder {
    pub fn newest_first() -> Self {
        Self {
            column: "createdat",
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// The network client for the hosted store. Rows and feed payloads are raw
/// storage-shaped JSON.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn select(&self, table: Table, order: SortOrder) -> Result<Vec<Value>, StorageError>;

    async fn upsert(&self, table: Table, row: Value) -> Result<(), StorageError>;

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), StorageError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), StorageError>;

    async fn subscribe(&self, table: Table) -> Result<mpsc::Receiver<Value>, StorageError>;
}

pub struct RemoteStore {
    client: Arc<dyn StorageClient>,
}

impl RemoteStore {
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self { client }
    }

    async fn select_rows<R, T>(&self, table: Table) -> Result<Vec<T>, GatewayError>
    where
        R: DeserializeOwned,
        T: From<R>,
    {
        let rows = self
            .client
            .select(table, SortOrder::newest_first())
            .await
            .map_err(read_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<R>(row) {
                Ok(row) => records.push(T::from(row)),
                Err(e) => warn!(%table, error = %e, "Skipping unreadable row"),
            }
        }
        debug!(%table, count = records.len(), "Fetched rows");
        Ok(records)
    }

    async fn subscribe(&self, table: Table) -> Result<Subscription, GatewayError> {
        let events = self.client.subscribe(table).await.map_err(read_error)?;
        Ok(Subscription::new(table.name(), events))
    }
}

fn read_error(e: StorageError) -> GatewayError {
    match e {
        StorageError::Unreachable(msg) | StorageError::Rejected(msg) => GatewayError::Connectivity(msg),
    }
}

fn write_error(table: Table, id: &str, e: StorageError) -> GatewayError {
    error!(%table, id, error = %e, "Remote write failed");
    match e {
        StorageError::Unreachable(msg) => GatewayError::Connectivity(msg),
        StorageError::Rejected(reason) => GatewayError::WriteRejected {
            entity: table.entity(),
            id: id.to_string(),
            reason,
        },
    }
}

#[async_trait]
impl PersistenceGateway for RemoteStore {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    fn pushes_changes(&self) -> bool {
        true
    }

    async fn try_fetch_designs(&self) -> Result<Vec<Design>, GatewayError> {
        self.select_rows::<DesignRow, Design>(Table::Designs).await
    }

    async fn try_fetch_orders(&self) -> Result<Vec<Order>, GatewayError> {
        self.select_rows::<OrderRow, Order>(Table::Orders).await
    }

    #[instrument(fields(design_id = %design.id), skip(self, design))]
    async fn upsert_design(&self, design: &Design) -> Result<(), GatewayError> {
        let row = serde_json::to_value(DesignRow::from(design))?;
        self.client
            .upsert(Table::Designs, row)
            .await
            .map_err(|e| write_error(Table::Designs, &design.id, e))
    }

    #[instrument(fields(design_id = %id), skip(self))]
    async fn remove_design(&self, id: &str) -> Result<(), GatewayError> {
        self.client
            .delete(Table::Designs, id)
            .await
            .map_err(|e| write_error(Table::Designs, id, e))
    }

    #[instrument(fields(order_id = %order.id), skip(self, order))]
    async fn upsert_order(&self, order: &Order) -> Result<(), GatewayError> {
        let row = serde_json::to_value(OrderRow::from(order))?;
        self.client
            .upsert(Table::Orders, row)
            .await
            .map_err(|e| write_error(Table::Orders, &order.id, e))
    }

    #[instrument(fields(order_id = %id, status = %status), skip(self))]
    async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<(), GatewayError> {
        self.client
            .update(Table::Orders, id, json!({ "status": status.as_str() }))
            .await
            .map_err(|e| write_error(Table::Orders, id, e))
    }

    async fn subscribe_to_designs(&self) -> Result<Subscription, GatewayError> {
        self.subscribe(Table::Designs).await
    }

    async fn subscribe_to_orders(&self) -> Result<Subscription, GatewayError> {
        self.subscribe(Table::Orders).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::seed_catalog;
    use crate::gateway::ChangeKind;
    use crate::mock_framework::MemoryStorageClient;
    use assert_matches::assert_matches;

    fn store() -> (Arc<MemoryStorageClient>, RemoteStore) {
        let client = Arc::new(MemoryStorageClient::new());
        (client.clone(), RemoteStore::new(client))
    }

    #[tokio::test]
    async fn fetch_is_newest_first_and_skips_bad_rows() {
        let (client, store) = store();
        let mut older = seed_catalog().remove(0);
        older.id = "old".into();
        older.created_at = 10;
        let mut newer = older.clone();
        newer.id = "new".into();
        newer.created_at = 20;

        store.upsert_design(&older).await.unwrap();
        store.upsert_design(&newer).await.unwrap();
        client.insert_raw(Table::Designs, json!({"id": "bad", "inventory": {"men": {"S": 1}}}));

        let ids: Vec<String> = store.try_fetch_designs().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn unreachable_store_degrades_reads() {
        let (client, store) = store();
        client.set_unreachable(true);

        assert_matches!(store.try_fetch_orders().await, Err(GatewayError::Connectivity(_)));
        assert_eq!(store.fetch_designs().await, seed_catalog());
        assert!(store.fetch_orders().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_write_names_the_record() {
        let (client, store) = store();
        client.reject_writes(Table::Designs);

        let result = store.upsert_design(&seed_catalog().remove(0)).await;
        assert_matches!(
            result,
            Err(GatewayError::WriteRejected { entity: "design", ref id, .. }) if id == "1"
        );
    }

    #[tokio::test]
    async fn status_update_is_pushed_on_the_feed() {
        let (client, store) = store();
        let mut subscription = store.subscribe_to_orders().await.unwrap();
        assert!(subscription.is_live());

        client.insert_raw(
            Table::Orders,
            json!({"id": "o1", "designid": "1", "combotype": "F-M", "status": "pending", "createdat": 1}),
        );
        store.update_order_status("o1", OrderStatus::Accepted).await.unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.event_type, ChangeKind::Update);
        assert_eq!(event.new.unwrap()["status"], "accepted");
    }
}
