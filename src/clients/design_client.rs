use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::actor_framework::CollectionClient;
use crate::domain::{Category, Design, DesignDraft, DesignPatch, Size};
use crate::error::DesignError;
use crate::gateway::PersistenceGateway;
use crate::ledger::{self, StockChange, StockSummary};

/// Shown for orders whose design no longer exists.
pub const UNKNOWN_DESIGN: &str = "Unknown Design";

/// Staff-side write path for the design catalog.
///
/// Every change is computed on the current in-memory record, written to the
/// gateway as a whole record, then mirrored into the collection.
#[derive(Clone)]
pub struct DesignClient {
    collection: CollectionClient<Design>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl DesignClient {
    pub fn new(collection: CollectionClient<Design>, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { collection, gateway }
    }

    async fn require(&self, id: &str) -> Result<Design, DesignError> {
        self.collection
            .get(id)
            .await?
            .ok_or_else(|| DesignError::NotFound(id.to_string()))
    }

    async fn persist(&self, design: Design) -> Result<Design, DesignError> {
        if let Err(e) = self.gateway.upsert_design(&design).await {
            error!(design_id = %design.id, error = %e, "Design write failed");
            return Err(e.into());
        }
        self.collection.upsert(design.clone()).await?;
        Ok(design)
    }

    /// Overwrites one stock cell; negative values store zero.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        design_id: &str,
        category: Category,
        size: Size,
        value: i64,
    ) -> Result<StockChange, DesignError> {
        debug!("Sending request");
        let design = self.require(design_id).await?;
        let change = ledger::set_value(&design, category, size, value)?;
        self.persist(change.design.clone()).await?;
        info!(previous = change.previous, count = change.count, "Stock set");
        Ok(change)
    }

    /// Takes `amount` units from one cell, stopping at zero. Returns `None`
    /// when the design is not in the catalog.
    #[instrument(skip(self))]
    pub async fn decrement_stock(
        &self,
        design_id: &str,
        category: Category,
        size: Size,
        amount: u32,
    ) -> Result<Option<StockChange>, DesignError> {
        debug!("Sending request");
        let Some(design) = self.collection.get(design_id).await? else {
            return Ok(None);
        };
        let change = ledger::decrement(&design, category, size, amount)?;
        self.persist(change.design.clone()).await?;
        info!(previous = change.previous, count = change.count, "Stock decremented");
        Ok(Some(change))
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_design(&self, draft: DesignDraft) -> Result<Design, DesignError> {
        debug!("Sending request");
        validate_name(&draft.name)?;
        let design = Design::from_draft(Uuid::new_v4().to_string(), draft, Utc::now().timestamp_millis());
        let design = self.persist(design).await?;
        info!(design_id = %design.id, "Design created");
        Ok(design)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_design(&self, id: &str, patch: DesignPatch) -> Result<Design, DesignError> {
        debug!("Sending request");
        let mut design = self.require(id).await?;
        design.apply_patch(patch);
        validate_name(&design.name)?;
        let design = self.persist(design).await?;
        info!("Design updated");
        Ok(design)
    }

    #[instrument(skip(self))]
    pub async fn delete_design(&self, id: &str) -> Result<(), DesignError> {
        debug!("Sending request");
        if let Err(e) = self.gateway.remove_design(id).await {
            error!(error = %e, "Design delete failed");
            return Err(e.into());
        }
        self.collection.remove(id).await?;
        info!("Design deleted");
        Ok(())
    }

    /// Display name for a design id, tolerating dangling references.
    #[instrument(skip(self))]
    pub async fn design_label(&self, id: &str) -> Result<String, DesignError> {
        Ok(self
            .collection
            .get(id)
            .await?
            .map(|design| design.name)
            .unwrap_or_else(|| UNKNOWN_DESIGN.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<StockSummary, DesignError> {
        Ok(ledger::summarize(&self.collection.snapshot().await?))
    }

    /// Replaces the collection with a fresh gateway read.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<usize, DesignError> {
        let designs = self.gateway.fetch_designs().await;
        let count = designs.len();
        self.collection.replace(designs).await?;
        info!(count, "Designs reloaded");
        Ok(count)
    }
}

impl_collection_reads!(DesignClient, Design, DesignError, design);

fn validate_name(name: &str) -> Result<(), DesignError> {
    if name.trim().is_empty() {
        return Err(DesignError::ValidationError("Design name is required".to_string()));
    }
    Ok(())
}
