use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{FilterError, Query};

pub mod memory;

pub use memory::MemoryConnector;

/// Storage backend errors, passed through the repository layer verbatim.
#[derive(Debug, Error, Clone)]
pub enum ConnectorError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<FilterError> for ConnectorError {
    fn from(error: FilterError) -> Self {
        ConnectorError::InvalidQuery(error.to_string())
    }
}

/// Per-operation storage primitives consumed by the repository layer after
/// pre-notification has settled the effective parameters.
///
/// `id_property` names the record-id field of the model being operated on;
/// connectors have no other knowledge of model definitions. Every call is an
/// asynchronous boundary; implementations must not rely on callers tolerating
/// synchronous completion.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Persist a new record. When `data` carries no id under `id_property`,
    /// the connector generates one. Returns the record id.
    async fn create(
        &self,
        model: &str,
        id_property: &str,
        data: Map<String, Value>,
    ) -> Result<Value, ConnectorError>;

    /// All records matching `query`, with ordering and pagination applied.
    async fn all(
        &self,
        model: &str,
        query: &Query,
    ) -> Result<Vec<Map<String, Value>>, ConnectorError>;

    /// Count of records matching the where conditions.
    async fn count(
        &self,
        model: &str,
        where_clause: Option<&Value>,
    ) -> Result<usize, ConnectorError>;

    /// Replace the record stored under `id` with `data`.
    async fn save(
        &self,
        model: &str,
        id_property: &str,
        id: &Value,
        data: Map<String, Value>,
    ) -> Result<(), ConnectorError>;

    /// Remove all records matching the where conditions; returns the number
    /// removed.
    async fn destroy_all(
        &self,
        model: &str,
        where_clause: Option<&Value>,
    ) -> Result<usize, ConnectorError>;
}
