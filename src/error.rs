use thiserror::Error;

use crate::domain::{Category, OrderStatus, Size};

/// Failures of the actor channels behind a collection client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    Closed,
    #[error("Actor dropped the response")]
    Dropped,
    #[error("Actor task failed: {0}")]
    TaskFailed(String),
}

/// Errors from the persistence backends.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Store unreachable: {0}")]
    Connectivity(String),
    #[error("Write rejected for {entity} {id}: {reason}")]
    WriteRejected {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Storage(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Size {size} is not stocked in category {category}")]
    SizeOutOfRange { category: Category, size: Size },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DesignError {
    #[error("Design not found: {0}")]
    NotFound(String),
    #[error("Design validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Design persistence error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(#[from] FrameworkError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order {id} has already been processed ({status})")]
    AlreadyProcessed { id: String, status: OrderStatus },
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Order persistence error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(#[from] FrameworkError),
}

impl From<DesignError> for OrderError {
    fn from(e: DesignError) -> Self {
        match e {
            DesignError::NotFound(id) => OrderError::ValidationError(format!("Unknown design: {id}")),
            DesignError::ValidationError(msg) => OrderError::ValidationError(msg),
            DesignError::Ledger(e) => OrderError::Ledger(e),
            DesignError::Gateway(e) => OrderError::Gateway(e),
            DesignError::ActorCommunicationError(e) => OrderError::ActorCommunicationError(e),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
