//! Persistence gateway: one trait, two backends.
//!
//! [`LocalStore`] keeps everything in a key/value store on this machine and
//! never pushes changes. [`RemoteStore`] talks to a hosted table store through
//! a [`StorageClient`] and exposes its change feed. Callers hold an
//! `Arc<dyn PersistenceGateway>` chosen once by [`select`] and consult
//! [`PersistenceGateway::pushes_changes`] instead of the backend identity.

pub mod local;
pub mod mapping;
pub mod remote;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::{seed_catalog, Design, Order, OrderStatus};
use crate::error::GatewayError;

pub use local::{FileKeyValueStore, KeyValueStore, LocalStore, MemoryKeyValueStore};
pub use mapping::{DesignRow, OrderRow};
pub use remote::{RemoteStore, SortOrder, StorageClient, StorageError, Table};

/// Which backend a gateway is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Remote => f.write_str("remote"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChangeKey {
    #[serde(default)]
    pub id: Option<String>,
}

/// One change-feed notification. `new` carries a storage-shaped row and is
/// absent (or an empty object) on DELETE.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub event_type: ChangeKind,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<ChangeKey>,
}

impl ChangeEvent {
    pub fn insert(row: Value) -> Self {
        Self {
            event_type: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    pub fn update(row: Value) -> Self {
        Self {
            event_type: ChangeKind::Update,
            new: Some(row),
            old: None,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            event_type: ChangeKind::Delete,
            new: None,
            old: Some(ChangeKey { id: Some(id.into()) }),
        }
    }

    /// Id of the removed record on DELETE.
    pub fn old_id(&self) -> Option<&str> {
        self.old.as_ref().and_then(|key| key.id.as_deref())
    }
}

/// A standing change-feed channel. Dropping it unsubscribes.
pub struct Subscription {
    events: Option<mpsc::Receiver<Value>>,
    table: &'static str,
}

impl Subscription {
    /// A subscription that never yields, for backends without a push channel.
    pub fn inert(table: &'static str) -> Self {
        Self { events: None, table }
    }

    pub fn new(table: &'static str, events: mpsc::Receiver<Value>) -> Self {
        Self {
            events: Some(events),
            table,
        }
    }

    pub fn is_live(&self) -> bool {
        self.events.is_some()
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Next well-formed event, or `None` once the feed is closed. Payloads
    /// that are not change events are skipped.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        let events = self.events.as_mut()?;
        loop {
            let payload = events.recv().await?;
            match serde_json::from_value::<ChangeEvent>(payload) {
                Ok(event) => return Some(event),
                Err(e) => warn!(table = self.table, error = %e, "Skipping malformed change payload"),
            }
        }
    }

}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("table", &self.table)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Fetch, write and subscribe operations shared by both backends.
///
/// Writes report failures to the caller and never touch in-memory state;
/// `fetch_*` degrade on read failure while `try_fetch_*` surface it.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    fn backend(&self) -> Backend;

    /// Whether this backend delivers change events for writes.
    fn pushes_changes(&self) -> bool;

    async fn try_fetch_designs(&self) -> Result<Vec<Design>, GatewayError>;

    async fn try_fetch_orders(&self) -> Result<Vec<Order>, GatewayError>;

    async fn upsert_design(&self, design: &Design) -> Result<(), GatewayError>;

    async fn remove_design(&self, id: &str) -> Result<(), GatewayError>;

    async fn upsert_order(&self, order: &Order) -> Result<(), GatewayError>;

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<(), GatewayError>;

    async fn subscribe_to_designs(&self) -> Result<Subscription, GatewayError>;

    async fn subscribe_to_orders(&self) -> Result<Subscription, GatewayError>;

    /// Designs newest first, or the seed catalog if the read fails.
    async fn fetch_designs(&self) -> Vec<Design> {
        match self.try_fetch_designs().await {
            Ok(designs) => designs,
            Err(e) => {
                warn!(backend = %self.backend(), error = %e, "Design fetch failed, using seed catalog");
                seed_catalog()
            }
        }
    }

    /// Orders newest first, or nothing if the read fails.
    async fn fetch_orders(&self) -> Vec<Order> {
        match self.try_fetch_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(backend = %self.backend(), error = %e, "Order fetch failed, using empty list");
                Vec::new()
            }
        }
    }
}

/// Picks the backend once at startup: remote when a storage client is
/// available, local otherwise.
pub fn select<K>(
    remote: Option<Arc<dyn StorageClient>>,
    local: K,
) -> Arc<dyn PersistenceGateway>
where
    K: KeyValueStore + 'static,
{
    match remote {
        Some(client) => Arc::new(RemoteStore::new(client)),
        None => Arc::new(LocalStore::new(local)),
    }
}
