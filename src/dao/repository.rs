use std::sync::Arc;

use serde_json::{Map, Value};

use crate::connector::{Connector, ConnectorError};
use crate::filter::Query;
use crate::model::Model;
use crate::observer::operations::{AFTER_DELETE, AFTER_SAVE, BEFORE_SAVE, QUERY};
use crate::observer::HookContext;

use super::error::{BulkErrors, DaoError};
use super::instance::Instance;

/// Per-operation options. `notify: false` skips the `query` hook for a
/// lookup; composite operations use the same escape hatch internally so each
/// hook fires exactly once per logical item per phase.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub notify: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { notify: true }
    }
}

impl Options {
    pub fn silent() -> Self {
        Self { notify: false }
    }
}

/// The data-access operation surface for one model.
///
/// Every entry point follows the same shape: build a pre-context, notify,
/// re-read the (possibly mutated) context for the effective parameters, run
/// validation where applicable, call the connector, then notify the
/// post-operation with a context built from the storage result. A pre-notify
/// failure aborts before any storage call; a post-notify failure surfaces
/// after the storage mutation has already taken effect - there is no
/// compensating rollback.
pub struct Repository {
    model: Model,
    connector: Arc<dyn Connector>,
}

impl Repository {
    pub fn new(model: Model, connector: Arc<dyn Connector>) -> Self {
        Self { model, connector }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    /// Repository for a model derived from this one, on the same connector.
    pub fn extend(&self, name: impl Into<String>) -> Repository {
        Repository::new(self.model.extend(name), self.connector.clone())
    }

    // ========================================
    // Create
    // ========================================

    pub async fn create(&self, data: Map<String, Value>) -> Result<Instance, DaoError> {
        let instance = Instance::new(self.model.clone(), data);
        let mut ctx = HookContext::save(self.model.clone(), instance);
        self.model.notify(BEFORE_SAVE, &mut ctx).await?;

        let mut instance = ctx.into_instance();
        instance.validate()?;

        let id = self
            .connector
            .create(
                self.model.model_name(),
                self.model.id_property(),
                instance.to_map(),
            )
            .await?;
        instance.set_id(id);
        instance.mark_stored();

        self.notify_after_save(instance).await
    }

    /// Create one record per input, in input order. Each item runs its own
    /// independent pre/post notification pair: one item's failure never
    /// blocks its siblings, and `after save` fires only for items that were
    /// actually written. On any failure the outcome carries a per-item error
    /// list positionally aligned with the inputs; failed positions hold the
    /// un-persisted instance.
    pub async fn create_many(
        &self,
        inputs: Vec<Map<String, Value>>,
    ) -> Result<Vec<Instance>, BulkErrors> {
        let mut instances = Vec::with_capacity(inputs.len());
        let mut errors: Vec<Option<DaoError>> = Vec::with_capacity(inputs.len());
        let mut any_failed = false;

        for data in inputs {
            match self.create(data.clone()).await {
                Ok(instance) => {
                    instances.push(instance);
                    errors.push(None);
                }
                Err(error) => {
                    any_failed = true;
                    instances.push(Instance::new(self.model.clone(), data));
                    errors.push(Some(error));
                }
            }
        }

        if any_failed {
            Err(BulkErrors { instances, errors })
        } else {
            Ok(instances)
        }
    }

    // ========================================
    // Lookups
    // ========================================

    pub async fn find(&self, query: Query) -> Result<Vec<Instance>, DaoError> {
        self.find_with_options(query, Options::default()).await
    }

    pub async fn find_with_options(
        &self,
        query: Query,
        options: Options,
    ) -> Result<Vec<Instance>, DaoError> {
        let effective = if options.notify {
            self.notified_query(query).await?
        } else {
            query
        };

        let rows = self.connector.all(self.model.model_name(), &effective).await?;
        Ok(rows
            .into_iter()
            .map(|row| Instance::from_stored(self.model.clone(), row))
            .collect())
    }

    pub async fn find_one(&self, query: Query) -> Result<Option<Instance>, DaoError> {
        let mut found = self.find(query.limited(1)).await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.remove(0))
        })
    }

    pub async fn find_by_id(&self, id: &Value) -> Result<Option<Instance>, DaoError> {
        self.find_one(Query::with_where(self.id_where(id))).await
    }

    pub async fn exists(&self, id: &Value) -> Result<bool, DaoError> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    pub async fn count(&self, where_clause: Option<Value>) -> Result<usize, DaoError> {
        let query = Query {
            where_clause,
            ..Default::default()
        };
        let effective = self.notified_query(query).await?;
        Ok(self
            .connector
            .count(self.model.model_name(), effective.where_clause.as_ref())
            .await?)
    }

    /// Find the first record matching `query`, or create one from `data`.
    /// The boolean reports whether a record was created. The save-phase
    /// hooks fire only in the created case - finding an existing record
    /// never notifies `before save`/`after save`.
    pub async fn find_or_create(
        &self,
        query: Query,
        data: Map<String, Value>,
    ) -> Result<(Instance, bool), DaoError> {
        // hooks see the real lookup criteria, explicit pagination included
        let mut lookup = query;
        lookup.limit = Some(1);
        lookup.offset = Some(0);
        lookup.skip = Some(0);

        let effective = self.notified_query(lookup).await?;
        let found = self
            .connector
            .all(self.model.model_name(), &effective)
            .await?
            .into_iter()
            .next();

        match found {
            Some(row) => Ok((Instance::from_stored(self.model.clone(), row), false)),
            None => {
                let created = self.create(data).await?;
                Ok((created, true))
            }
        }
    }

    // ========================================
    // Save / update
    // ========================================

    /// Persist the instance: update when it carries an id, create otherwise.
    pub async fn save(&self, instance: Instance) -> Result<Instance, DaoError> {
        let mut ctx = HookContext::save(self.model.clone(), instance);
        self.model.notify(BEFORE_SAVE, &mut ctx).await?;

        let mut instance = ctx.into_instance();
        instance.validate()?;

        match instance.id().cloned() {
            Some(id) => {
                self.connector
                    .save(
                        self.model.model_name(),
                        self.model.id_property(),
                        &id,
                        instance.to_map(),
                    )
                    .await?;
            }
            None => {
                let id = self
                    .connector
                    .create(
                        self.model.model_name(),
                        self.model.id_property(),
                        instance.to_map(),
                    )
                    .await?;
                instance.set_id(id);
            }
        }
        instance.mark_stored();

        self.notify_after_save(instance).await
    }

    /// Apply a partial update to a persisted instance. The `before save`
    /// context carries the update payload and the id criteria; the id itself
    /// is fixed - mutations to the payload are honored, mutations to the
    /// criteria are not.
    pub async fn update_attributes(
        &self,
        instance: &Instance,
        data: Map<String, Value>,
    ) -> Result<Instance, DaoError> {
        let id = instance.id().cloned().ok_or_else(|| {
            ConnectorError::NotFound(format!(
                "{} instance has no id",
                self.model.model_name()
            ))
        })?;

        let mut ctx = HookContext::update(self.model.clone(), self.id_where(&id), data);
        self.model.notify(BEFORE_SAVE, &mut ctx).await?;
        let (_criteria, mut data) = ctx.into_update();
        data.remove(self.model.id_property());

        let mut updated = instance.clone();
        updated.merge(data);
        updated.validate()?;

        self.connector
            .save(
                self.model.model_name(),
                self.model.id_property(),
                &id,
                updated.to_map(),
            )
            .await?;
        updated.mark_stored();

        self.notify_after_save(updated).await
    }

    /// Update the record identified by the id in `data`, creating it when no
    /// match exists.
    ///
    /// This is the default non-atomic path: the lookup loads the stored
    /// record first, so properties unset in `data` are filled from existing
    /// values, and a `query`-hook mutation of the lookup criteria is
    /// honored. A connector-provided atomic find+write primitive would skip
    /// both - an accepted inconsistency, not one this path papers over.
    pub async fn update_or_create(&self, data: Map<String, Value>) -> Result<Instance, DaoError> {
        let id_property = self.model.id_property().to_string();
        let supplied_id = data.get(&id_property).filter(|v| !v.is_null()).cloned();

        // the lookup phase, and with it the `query` hook, runs only when the
        // input carries an id
        let existing = match &supplied_id {
            Some(id) => {
                let effective = self
                    .notified_query(Query::with_where(self.id_where(id)))
                    .await?;
                self.connector
                    .all(self.model.model_name(), &effective.limited(1))
                    .await?
                    .into_iter()
                    .next()
            }
            None => None,
        };

        match existing {
            Some(row) => {
                let mut instance = Instance::from_stored(self.model.clone(), row);
                let mut data = data;
                // the found record's id wins over the one in the payload
                data.remove(&id_property);
                instance.merge(data);

                let mut ctx = HookContext::save(self.model.clone(), instance);
                self.model.notify(BEFORE_SAVE, &mut ctx).await?;

                let mut instance = ctx.into_instance();
                instance.validate()?;

                let id = instance.id().cloned().ok_or_else(|| {
                    ConnectorError::NotFound(format!(
                        "{} record lost its id during notification",
                        self.model.model_name()
                    ))
                })?;
                self.connector
                    .save(self.model.model_name(), &id_property, &id, instance.to_map())
                    .await?;
                instance.mark_stored();

                self.notify_after_save(instance).await
            }
            None => self.create(data).await,
        }
    }

    // ========================================
    // Delete
    // ========================================

    /// Delete all records matching the criteria; returns the number removed.
    /// The `query` hook sees (and may replace) the criteria before the
    /// storage call; `after delete` carries the criteria actually used.
    pub async fn delete_all(&self, where_clause: Option<Value>) -> Result<usize, DaoError> {
        let where_clause = where_clause.unwrap_or_else(|| Value::Object(Map::new()));

        let effective = self
            .notified_query(Query::with_where(where_clause))
            .await?;
        let effective_where = effective
            .where_clause
            .unwrap_or_else(|| Value::Object(Map::new()));

        let removed = self
            .connector
            .destroy_all(self.model.model_name(), Some(&effective_where))
            .await?;

        let mut post = HookContext::delete(self.model.clone(), effective_where);
        self.model.notify(AFTER_DELETE, &mut post).await?;

        Ok(removed)
    }

    /// Delete one record by id. Fires the same hook pair as `delete_all`,
    /// exactly once, with id criteria.
    pub async fn delete_by_id(&self, id: &Value) -> Result<usize, DaoError> {
        self.delete_all(Some(self.id_where(id))).await
    }

    // ========================================
    // Internals
    // ========================================

    async fn notified_query(&self, query: Query) -> Result<Query, DaoError> {
        let mut ctx = HookContext::query(self.model.clone(), query);
        self.model.notify(QUERY, &mut ctx).await?;
        Ok(ctx.into_query())
    }

    async fn notify_after_save(&self, instance: Instance) -> Result<Instance, DaoError> {
        let mut ctx = HookContext::save(self.model.clone(), instance);
        self.model.notify(AFTER_SAVE, &mut ctx).await?;
        Ok(ctx.into_instance())
    }

    fn id_where(&self, id: &Value) -> Value {
        let mut criteria = Map::new();
        criteria.insert(self.model.id_property().to_string(), id.clone());
        Value::Object(criteria)
    }
}
