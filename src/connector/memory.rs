use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::connector::{Connector, ConnectorError};
use crate::filter::{Filter, Query};

/// In-memory storage backend. Rows are kept per model in id order, so
/// unordered queries return records deterministically.
///
/// This is the connector the test suite runs against and the reference for
/// what the repository layer expects from a backend.
#[derive(Default)]
pub struct MemoryConnector {
    store: RwLock<HashMap<String, BTreeMap<String, Map<String, Value>>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_key(id: &Value) -> String {
        match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        model: &str,
        id_property: &str,
        mut data: Map<String, Value>,
    ) -> Result<Value, ConnectorError> {
        let id = match data.get(id_property) {
            Some(id) if !id.is_null() => id.clone(),
            _ => Value::String(Uuid::new_v4().to_string()),
        };
        data.insert(id_property.to_string(), id.clone());

        let key = Self::id_key(&id);
        let mut store = self.store.write().await;
        let table = store.entry(model.to_string()).or_default();
        if table.contains_key(&key) {
            return Err(ConnectorError::DuplicateId(key));
        }

        tracing::trace!("memory: create {} id={}", model, key);
        table.insert(key, data);
        Ok(id)
    }

    async fn all(
        &self,
        model: &str,
        query: &Query,
    ) -> Result<Vec<Map<String, Value>>, ConnectorError> {
        let store = self.store.read().await;
        let rows = store
            .get(model)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        Ok(Filter::apply(rows, query)?)
    }

    async fn count(
        &self,
        model: &str,
        where_clause: Option<&Value>,
    ) -> Result<usize, ConnectorError> {
        let store = self.store.read().await;
        let rows: Vec<Map<String, Value>> = store
            .get(model)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        Ok(Filter::count(&rows, where_clause)?)
    }

    async fn save(
        &self,
        model: &str,
        id_property: &str,
        id: &Value,
        mut data: Map<String, Value>,
    ) -> Result<(), ConnectorError> {
        let key = Self::id_key(id);
        data.insert(id_property.to_string(), id.clone());

        let mut store = self.store.write().await;
        let row = store
            .get_mut(model)
            .and_then(|table| table.get_mut(&key))
            .ok_or_else(|| ConnectorError::NotFound(format!("{} id={}", model, key)))?;

        tracing::trace!("memory: save {} id={}", model, key);
        *row = data;
        Ok(())
    }

    async fn destroy_all(
        &self,
        model: &str,
        where_clause: Option<&Value>,
    ) -> Result<usize, ConnectorError> {
        let mut store = self.store.write().await;
        let table = match store.get_mut(model) {
            Some(table) => table,
            None => return Ok(0),
        };

        let doomed: Vec<String> = match where_clause {
            None => table.keys().cloned().collect(),
            Some(where_data) => {
                let mut keys = Vec::new();
                for (key, row) in table.iter() {
                    if crate::filter::FilterWhere::matches(where_data, row)? {
                        keys.push(key.clone());
                    }
                }
                keys
            }
        };

        for key in &doomed {
            table.remove(key);
        }

        tracing::trace!("memory: destroyed {} rows in {}", doomed.len(), model);
        Ok(doomed.len())
    }
}
