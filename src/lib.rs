//! Inventory and order consistency for a family-combo clothing storefront.
//!
//! Designs and orders live in collection actors ([`actor_framework`]) fed by
//! a [`gateway::PersistenceGateway`]. Staff edits go through
//! [`clients::DesignClient`], the order lifecycle through
//! [`clients::OrderClient`], and a pushing backend's change feed is merged in
//! by the [`reconciler`].

pub mod actor_framework;
pub mod app_system;
pub mod clients;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod reconciler;

#[cfg(test)]
mod mock_framework;
