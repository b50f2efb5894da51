//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a collection client and the receiver its
//! requests land on, then helpers like [`expect_get`] or [`expect_replace`] to
//! assert and answer them. [`MemoryStorageClient`] stands in for the hosted
//! store, with a live change feed and failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{CollectionClient, CollectionRequest};
use crate::gateway::{SortOrder, StorageClient, StorageError, Table};
use crate::reconciler::{Applied, Record};

// =============================================================================
// 1. MOCK COLLECTIONS
// =============================================================================

/// Creates a collection client whose requests are delivered to the returned
/// receiver instead of an actor.
pub fn create_mock_client<T: Record>(
    buffer_size: usize,
) -> (CollectionClient<T>, mpsc::Receiver<CollectionRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (CollectionClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Record>(
    receiver: &mut mpsc::Receiver<CollectionRequest<T>>,
) -> Option<(String, oneshot::Sender<Option<T>>)> {
    match receiver.recv().await {
        Some(CollectionRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Upsert request
pub async fn expect_upsert<T: Record>(
    receiver: &mut mpsc::Receiver<CollectionRequest<T>>,
) -> Option<(T, oneshot::Sender<Applied>)> {
    match receiver.recv().await {
        Some(CollectionRequest::Upsert { record, respond_to }) => Some((record, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Replace request
pub async fn expect_replace<T: Record>(
    receiver: &mut mpsc::Receiver<CollectionRequest<T>>,
) -> Option<(Vec<T>, oneshot::Sender<()>)> {
    match receiver.recv().await {
        Some(CollectionRequest::Replace { records, respond_to }) => Some((records, respond_to)),
        _ => None,
    }
}

/// Gives spawned feed pumps time to drain.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// =============================================================================
// 2. IN-MEMORY HOSTED STORE
// =============================================================================

/// Tables of raw rows plus a change feed per table. Writes emit the event the
/// hosted store would push.
#[derive(Default)]
pub struct MemoryStorageClient {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    feeds: Mutex<HashMap<Table, Vec<mpsc::Sender<Value>>>>,
    unreachable: AtomicBool,
    rejecting: Mutex<HashSet<Table>>,
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `Unreachable` while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Writes to `table` fail with `Rejected` from now on.
    pub fn reject_writes(&self, table: Table) {
        self.rejecting.lock().unwrap().insert(table);
    }

    pub fn accept_writes(&self, table: Table) {
        self.rejecting.lock().unwrap().remove(&table);
    }

    /// Stores a row without emitting an event.
    pub fn insert_raw(&self, table: Table, row: Value) {
        self.tables.lock().unwrap().entry(table).or_default().push(row);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.lock().unwrap().get(&table).cloned().unwrap_or_default()
    }

    /// Pushes an arbitrary payload to every subscriber of `table`.
    pub async fn push_event(&self, table: Table, payload: Value) {
        let senders = self.feeds.lock().unwrap().get(&table).cloned().unwrap_or_default();
        for sender in senders {
            let _ = sender.send(payload.clone()).await;
        }
    }

    fn check_reachable(&self) -> Result<(), StorageError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StorageError::Unreachable("connection refused".into()));
        }
        Ok(())
    }

    fn check_writable(&self, table: Table) -> Result<(), StorageError> {
        self.check_reachable()?;
        if self.rejecting.lock().unwrap().contains(&table) {
            return Err(StorageError::Rejected(format!("writes to {table} are disabled")));
        }
        Ok(())
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn select(&self, table: Table, order: SortOrder) -> Result<Vec<Value>, StorageError> {
        self.check_reachable()?;
        let mut rows = self.rows(table);
        rows.sort_by_key(|row| row.get(order.column).and_then(Value::as_i64).unwrap_or(0));
        if order.descending {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<(), StorageError> {
        self.check_writable(table)?;
        let id = row_id(&row)
            .ok_or_else(|| StorageError::Rejected("row has no id".into()))?
            .to_string();
        let event_type = {
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table).or_default();
            match rows.iter_mut().find(|existing| row_id(existing) == Some(id.as_str())) {
                Some(existing) => {
                    *existing = row.clone();
                    "UPDATE"
                }
                None => {
                    rows.push(row.clone());
                    "INSERT"
                }
            }
        };
        self.push_event(table, json!({"eventType": event_type, "new": row, "old": {"id": id}}))
            .await;
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), StorageError> {
        self.check_writable(table)?;
        let updated = {
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table).or_default();
            rows.iter_mut()
                .find(|existing| row_id(existing) == Some(id))
                .map(|existing| {
                    if let (Some(target), Some(fields)) = (existing.as_object_mut(), patch.as_object()) {
                        for (key, value) in fields {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                    existing.clone()
                })
        };
        if let Some(row) = updated {
            self.push_event(table, json!({"eventType": "UPDATE", "new": row, "old": {"id": id}}))
                .await;
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StorageError> {
        self.check_writable(table)?;
        let removed = {
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table).or_default();
            let before = rows.len();
            rows.retain(|existing| row_id(existing) != Some(id));
            rows.len() != before
        };
        if removed {
            self.push_event(table, json!({"eventType": "DELETE", "new": {}, "old": {"id": id}}))
                .await;
        }
        Ok(())
    }

    async fn subscribe(&self, table: Table) -> Result<mpsc::Receiver<Value>, StorageError> {
        self.check_reachable()?;
        let (sender, receiver) = mpsc::channel(64);
        self.feeds.lock().unwrap().entry(table).or_default().push(sender);
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{seed_catalog, Design};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Design>(10);

        let get_task = tokio::spawn(async move { client.get("1").await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "1");
        responder.send(Some(seed_catalog().remove(0))).unwrap();

        let result = get_task.await.unwrap().unwrap();
        assert_eq!(result.map(|d| d.name), Some("Garden Leaf Print".to_string()));
    }

    #[tokio::test]
    async fn storage_client_emits_feed_events() {
        let storage = MemoryStorageClient::new();
        let mut feed = storage.subscribe(Table::Orders).await.unwrap();

        storage.upsert(Table::Orders, json!({"id": "o1", "status": "pending"})).await.unwrap();
        storage.update(Table::Orders, "o1", json!({"status": "rejected"})).await.unwrap();
        storage.update(Table::Orders, "ghost", json!({"status": "rejected"})).await.unwrap();
        storage.delete(Table::Orders, "o1").await.unwrap();

        assert_eq!(feed.recv().await.unwrap()["eventType"], "INSERT");
        let update = feed.recv().await.unwrap();
        assert_eq!(update["new"]["status"], "rejected");
        assert_eq!(feed.recv().await.unwrap()["eventType"], "DELETE");
        assert!(storage.rows(Table::Orders).is_empty());
    }
}
