use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::model::Model;
use crate::validate::{self, ValidationError};

/// A model-bound record with change tracking.
///
/// Instances carry their field map plus the original snapshot loaded from
/// storage (absent for records that have not been persisted yet), so
/// observers and callers can ask what changed.
#[derive(Debug, Clone)]
pub struct Instance {
    model: Model,
    fields: Map<String, Value>,
    /// Original state from storage (None before the first save)
    original: Option<Map<String, Value>>,
    modified_fields: HashSet<String>,
}

impl Instance {
    /// Fresh, not-yet-persisted instance.
    pub fn new(model: Model, fields: Map<String, Value>) -> Self {
        Self {
            model,
            fields,
            original: None,
            modified_fields: HashSet::new(),
        }
    }

    /// Instance materialized from a stored row.
    pub fn from_stored(model: Model, fields: Map<String, Value>) -> Self {
        Self {
            model,
            original: Some(fields.clone()),
            fields,
            modified_fields: HashSet::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field value with automatic change tracking.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }
        self.fields.insert(key, value.into());
        self
    }

    /// Remove a field and return its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if self.original.is_some() {
            self.modified_fields.insert(key.to_string());
        }
        self.fields.remove(key)
    }

    /// Remove a field (chainable).
    pub fn unset(&mut self, key: &str) -> &mut Self {
        self.remove(key);
        self
    }

    /// Apply multiple changes at once.
    pub fn merge(&mut self, changes: Map<String, Value>) -> &mut Self {
        for (key, value) in changes {
            self.set(key, value);
        }
        self
    }

    /// The record id, `None` when unset or null.
    pub fn id(&self) -> Option<&Value> {
        self.fields
            .get(self.model.id_property())
            .filter(|v| !v.is_null())
    }

    pub fn set_id(&mut self, id: Value) -> &mut Self {
        let id_property = self.model.id_property().to_string();
        self.set(id_property, id)
    }

    // ========================================
    // Change tracking
    // ========================================

    /// Check if a specific field differs from the stored original.
    pub fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (Some(original), None) => original.contains_key(key),
            (None, Some(_)) => true, // new field on an unsaved instance
            (None, None) => false,
        }
    }

    /// Check if the instance has any unsaved changes.
    pub fn has_changes(&self) -> bool {
        !self.modified_fields.is_empty() || self.original.is_none()
    }

    /// Original data (before changes), when loaded from storage.
    pub fn original(&self) -> Option<&Map<String, Value>> {
        self.original.as_ref()
    }

    /// Reset the baseline after a successful storage write.
    pub(crate) fn mark_stored(&mut self) {
        self.original = Some(self.fields.clone());
        self.modified_fields.clear();
    }

    // ========================================
    // Validation and serialization
    // ========================================

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate(&self.model, &self.fields)
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.fields.clone()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance.fields)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(id: {:?}, fields: {}, changed: {})",
            self.model.model_name(),
            self.id(),
            self.fields.len(),
            self.has_changes()
        )
    }
}
