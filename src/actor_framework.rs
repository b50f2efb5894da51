use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::FrameworkError;
use crate::gateway::{ChangeEvent, Subscription};
use crate::reconciler::{self, Applied, Record};

// =============================================================================
// 1. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<T>;

/// Requests understood by a [`CollectionActor`]. Direct writes and feed events
/// arrive on the same channel, so the actor is the only writer.
#[derive(Debug)]
pub enum CollectionRequest<T: Record> {
    Snapshot {
        respond_to: Response<Vec<T>>,
    },
    Get {
        id: String,
        respond_to: Response<Option<T>>,
    },
    Replace {
        records: Vec<T>,
        respond_to: Response<()>,
    },
    Upsert {
        record: T,
        respond_to: Response<Applied>,
    },
    Remove {
        id: String,
        respond_to: Response<Applied>,
    },
    Reconcile {
        event: ChangeEvent,
        respond_to: Response<Applied>,
    },
    Shutdown,
}

// =============================================================================
// 2. THE GENERIC ACTOR SERVER
// =============================================================================

/// Owns one ordered, newest-first collection.
pub struct CollectionActor<T: Record> {
    receiver: mpsc::Receiver<CollectionRequest<T>>,
    records: Vec<T>,
}

impl<T: Record> CollectionActor<T> {
    pub fn new(buffer_size: usize) -> (Self, CollectionClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            records: Vec::new(),
        };
        (actor, CollectionClient::new(sender))
    }

    pub async fn run(mut self) {
        info!(entity = T::ENTITY, "Collection actor started");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CollectionRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.records.clone());
                }
                CollectionRequest::Get { id, respond_to } => {
                    let record = self.records.iter().find(|r| r.id() == id).cloned();
                    let _ = respond_to.send(record);
                }
                CollectionRequest::Replace { records, respond_to } => {
                    debug!(entity = T::ENTITY, count = records.len(), "Replacing collection");
                    self.records = records;
                    let _ = respond_to.send(());
                }
                CollectionRequest::Upsert { record, respond_to } => {
                    let applied = reconciler::upsert(&mut self.records, record);
                    let _ = respond_to.send(applied);
                }
                CollectionRequest::Remove { id, respond_to } => {
                    let applied = reconciler::remove(&mut self.records, &id);
                    let _ = respond_to.send(applied);
                }
                CollectionRequest::Reconcile { event, respond_to } => {
                    let applied = reconciler::apply(&mut self.records, &event);
                    let _ = respond_to.send(applied);
                }
                CollectionRequest::Shutdown => break,
            }
        }
        info!(entity = T::ENTITY, "Collection actor stopped");
    }
}

// =============================================================================
// 3. THE GENERIC CLIENT
// =============================================================================

pub struct CollectionClient<T: Record> {
    sender: mpsc::Sender<CollectionRequest<T>>,
}

impl<T: Record> Clone for CollectionClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Record> CollectionClient<T> {
    pub fn new(sender: mpsc::Sender<CollectionRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> CollectionRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::Closed)?;
        response.await.map_err(|_| FrameworkError::Dropped)
    }

    /// All records, newest first.
    pub async fn snapshot(&self) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Snapshot { respond_to }).await
    }

    pub async fn get(&self, id: impl Into<String>) -> Result<Option<T>, FrameworkError> {
        let id = id.into();
        self.request(|respond_to| CollectionRequest::Get { id, respond_to }).await
    }

    pub async fn replace(&self, records: Vec<T>) -> Result<(), FrameworkError> {
        self.request(|respond_to| CollectionRequest::Replace { records, respond_to }).await
    }

    pub async fn upsert(&self, record: T) -> Result<Applied, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Upsert { record, respond_to }).await
    }

    pub async fn remove(&self, id: impl Into<String>) -> Result<Applied, FrameworkError> {
        let id = id.into();
        self.request(|respond_to| CollectionRequest::Remove { id, respond_to }).await
    }

    pub async fn reconcile(&self, event: ChangeEvent) -> Result<Applied, FrameworkError> {
        self.request(|respond_to| CollectionRequest::Reconcile { event, respond_to }).await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.sender
            .send(CollectionRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::Closed)
    }
}

// =============================================================================
// 4. FEED PUMP
// =============================================================================

/// Forwards every event of `subscription` to the collection in delivery
/// order. Ends when the feed closes or the collection actor stops.
pub async fn pump<T: Record>(mut subscription: Subscription, collection: CollectionClient<T>) {
    info!(table = subscription.table(), "Change feed attached");
    while let Some(event) = subscription.next().await {
        match collection.reconcile(event).await {
            Ok(applied) if applied.changed() => {
                debug!(table = subscription.table(), ?applied, "Change event reconciled")
            }
            Ok(applied) => debug!(table = subscription.table(), ?applied, "Change event left collection as is"),
            Err(e) => {
                warn!(table = subscription.table(), error = %e, "Collection gone, detaching feed");
                break;
            }
        }
    }
    info!(table = subscription.table(), "Change feed detached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{seed_catalog, Design};
    use crate::gateway::mapping::DesignRow;

    fn design(id: &str) -> Design {
        let mut design = seed_catalog().remove(0);
        design.id = id.to_string();
        design
    }

    #[tokio::test]
    async fn writes_and_events_share_one_collection() {
        let (actor, client) = CollectionActor::<Design>::new(8);
        let handle = tokio::spawn(actor.run());

        client.replace(vec![design("a")]).await.unwrap();
        assert_eq!(client.upsert(design("b")).await.unwrap(), Applied::Inserted);

        let row = serde_json::to_value(DesignRow::from(&design("c"))).unwrap();
        assert_eq!(client.reconcile(ChangeEvent::insert(row)).await.unwrap(), Applied::Inserted);
        assert_eq!(client.remove("a").await.unwrap(), Applied::Removed);

        let ids: Vec<String> = client.snapshot().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert!(client.get("a").await.unwrap().is_none());

        client.shutdown().await.unwrap();
        handle.await.unwrap();
        assert_eq!(client.snapshot().await, Err(FrameworkError::Closed));
    }

    #[tokio::test]
    async fn pump_applies_feed_in_order() {
        let (actor, client) = CollectionActor::<Design>::new(8);
        tokio::spawn(actor.run());
        client.replace(vec![design("a"), design("b")]).await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let row = serde_json::to_value(DesignRow::from(&design("c"))).unwrap();
        tx.send(serde_json::json!({"eventType": "INSERT", "new": row})).await.unwrap();
        tx.send(serde_json::json!({"eventType": "DELETE", "old": {"id": "a"}}))
            .await
            .unwrap();
        drop(tx);

        pump(Subscription::new("designs", rx), client.clone()).await;

        let ids: Vec<String> = client.snapshot().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
