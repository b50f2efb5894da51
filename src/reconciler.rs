//! Merges change-feed events into an in-memory collection.
//!
//! Collections are ordered newest first and keyed by `id`. Applying an event
//! never reorders records it does not touch, and applying the same INSERT or
//! UPDATE twice leaves the collection as applying it once.

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Design, Order};
use crate::gateway::mapping::{DesignRow, OrderRow};
use crate::gateway::{ChangeEvent, ChangeKind};

/// A record held in a reconciled collection.
pub trait Record: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    const ENTITY: &'static str;

    fn id(&self) -> &str;

    /// Maps a storage-shaped row into the record.
    fn from_storage(row: Value) -> Result<Self, serde_json::Error>;
}

impl Record for Design {
    const ENTITY: &'static str = "design";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_storage(row: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<DesignRow>(row).map(Design::from)
    }
}

impl Record for Order {
    const ENTITY: &'static str = "order";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_storage(row: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<OrderRow>(row).map(Order::from)
    }
}

/// What an event or write did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Prepended a record that was absent.
    Inserted,
    /// Overwrote a record in place.
    Replaced,
    /// UPDATE for an id the collection does not hold.
    Dropped,
    Removed,
    /// DELETE for an id the collection does not hold.
    Ignored,
    /// The row could not be mapped.
    Malformed,
}

impl Applied {
    pub fn changed(self) -> bool {
        matches!(self, Applied::Inserted | Applied::Replaced | Applied::Removed)
    }
}

/// Overwrites the record with the same id in place, or prepends it.
pub fn upsert<T: Record>(records: &mut Vec<T>, record: T) -> Applied {
    match records.iter_mut().find(|existing| existing.id() == record.id()) {
        Some(existing) => {
            *existing = record;
            Applied::Replaced
        }
        None => {
            records.insert(0, record);
            Applied::Inserted
        }
    }
}

/// Removes the record with `id`, if held.
pub fn remove<T: Record>(records: &mut Vec<T>, id: &str) -> Applied {
    match records.iter().position(|record| record.id() == id) {
        Some(index) => {
            records.remove(index);
            Applied::Removed
        }
        None => Applied::Ignored,
    }
}

/// Applies one change-feed event.
pub fn apply<T: Record>(records: &mut Vec<T>, event: &ChangeEvent) -> Applied {
    let applied = match event.event_type {
        ChangeKind::Insert => match map_row::<T>(event) {
            Some(record) => upsert(records, record),
            None => Applied::Malformed,
        },
        ChangeKind::Update => match map_row::<T>(event) {
            Some(record) => match records.iter_mut().find(|existing| existing.id() == record.id()) {
                Some(existing) => {
                    *existing = record;
                    Applied::Replaced
                }
                None => {
                    warn!(entity = T::ENTITY, id = record.id(), "Dropping update for unknown record");
                    Applied::Dropped
                }
            },
            None => Applied::Malformed,
        },
        ChangeKind::Delete => match event.old_id() {
            Some(id) => remove(records, id),
            None => {
                warn!(entity = T::ENTITY, "Delete event without an id");
                Applied::Ignored
            }
        },
    };
    debug!(entity = T::ENTITY, event = ?event.event_type, ?applied, "Applied change event");
    applied
}

fn map_row<T: Record>(event: &ChangeEvent) -> Option<T> {
    let Some(row) = event.new.clone() else {
        warn!(entity = T::ENTITY, event = ?event.event_type, "Change event without a row");
        return None;
    };
    match T::from_storage(row) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(entity = T::ENTITY, error = %e, "Dropping unmappable change row");
            None
        }
    }
}
