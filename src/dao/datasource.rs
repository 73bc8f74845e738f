use std::sync::Arc;

use crate::connector::{Connector, MemoryConnector};
use crate::model::{ModelBuilder, PropertyDefinition};

use super::repository::Repository;

/// Binds a model builder to a storage connector and hands out repositories.
pub struct DataSource {
    builder: ModelBuilder,
    connector: Arc<dyn Connector>,
}

impl DataSource {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            builder: ModelBuilder::new(),
            connector,
        }
    }

    /// Data source over a fresh in-memory backend.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryConnector::new()))
    }

    /// Define a model and return its repository on this data source.
    pub fn define<S>(
        &self,
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (S, PropertyDefinition)>,
    ) -> Repository
    where
        S: Into<String>,
    {
        let model = self.builder.define(name, properties);
        Repository::new(model, self.connector.clone())
    }

    pub fn builder(&self) -> &ModelBuilder {
        &self.builder
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }
}
