use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::observer::context::HookContext;
use crate::observer::error::HookError;
use crate::observer::notifier;
use crate::observer::traits::{AsyncFnObserver, FnObserver, NotifyInspector, Observer};

/// Property value kinds understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Number,
    Boolean,
    Date,
    Any,
}

/// A single property of a model definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub kind: PropertyKind,
    pub required: bool,
    pub id: bool,
}

impl PropertyDefinition {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            required: false,
            id: false,
        }
    }

    pub fn string() -> Self {
        Self::new(PropertyKind::String)
    }

    pub fn number() -> Self {
        Self::new(PropertyKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(PropertyKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(PropertyKind::Date)
    }

    pub fn any() -> Self {
        Self::new(PropertyKind::Any)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }
}

struct ModelInner {
    name: String,
    parent: Option<Model>,
    properties: HashMap<String, PropertyDefinition>,
    // Observer registry: operation name -> callbacks in registration order.
    // Written at model-definition time, read by every notification.
    observers: RwLock<HashMap<String, Vec<Arc<dyn Observer>>>>,
    inspector: RwLock<Option<Arc<dyn NotifyInspector>>>,
}

/// A named model descriptor: property definitions plus the observer registry.
///
/// Handles are cheap to clone and share one descriptor. Derived models link
/// to their base through an explicit parent handle; each layer owns its own
/// observer list, so registering on a derived model never mutates the base.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    fn new(name: String, parent: Option<Model>, properties: HashMap<String, PropertyDefinition>) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                name,
                parent,
                properties,
                observers: RwLock::new(HashMap::new()),
                inspector: RwLock::new(None),
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Model> {
        self.inner.parent.as_ref()
    }

    pub fn properties(&self) -> &HashMap<String, PropertyDefinition> {
        &self.inner.properties
    }

    /// Name of the property flagged as the record id, `"id"` when none is.
    pub fn id_property(&self) -> &str {
        self.inner
            .properties
            .iter()
            .find(|(_, def)| def.id)
            .map(|(name, _)| name.as_str())
            .unwrap_or("id")
    }

    /// Derive a child model. The child inherits the property definitions and
    /// sees the base's observers during notification, but registers its own
    /// observers into a fresh registry.
    pub fn extend(&self, name: impl Into<String>) -> Model {
        let name = name.into();
        tracing::debug!("Extending model {} as {}", self.inner.name, name);
        Model::new(name, Some(self.clone()), self.inner.properties.clone())
    }

    /// Register `observer` for `operation` on this model. Appends to the
    /// ordered list; registration always succeeds.
    pub fn observe(&self, operation: impl Into<String>, observer: Arc<dyn Observer>) {
        let operation = operation.into();
        tracing::debug!(
            "Registered observer for '{}' on model {}",
            operation,
            self.inner.name
        );
        self.inner
            .observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(operation)
            .or_default()
            .push(observer);
    }

    /// Register a plain synchronous closure as an observer.
    pub fn observe_fn<F>(&self, operation: impl Into<String>, callback: F)
    where
        F: Fn(&mut HookContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.observe(operation, Arc::new(FnObserver::new(callback)));
    }

    /// Register an async closure as an observer.
    pub fn observe_async<F>(&self, operation: impl Into<String>, callback: F)
    where
        F: for<'a> Fn(&'a mut HookContext) -> BoxFuture<'a, Result<(), HookError>>
            + Send
            + Sync
            + 'static,
    {
        self.observe(operation, Arc::new(AsyncFnObserver::new(callback)));
    }

    /// Run all applicable observers (inherited and own) for `operation`
    /// against `ctx`, sequentially, stopping at the first failure.
    ///
    /// Public equivalent of the notification the repository operations run
    /// internally; usable with application-defined operation names.
    pub async fn notify(
        &self,
        operation: &str,
        ctx: &mut HookContext,
    ) -> Result<(), HookError> {
        notifier::run_chain(self, operation, ctx).await
    }

    /// Install a call-order inspector. Notifications on this model and on
    /// models derived from it (unless they install their own) report to it.
    pub fn set_inspector(&self, inspector: Arc<dyn NotifyInspector>) {
        *self
            .inner
            .inspector
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(inspector);
    }

    pub(crate) fn inspector(&self) -> Option<Arc<dyn NotifyInspector>> {
        let own = self
            .inner
            .inspector
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match own {
            Some(inspector) => Some(inspector),
            None => self.inner.parent.as_ref().and_then(|p| p.inspector()),
        }
    }

    /// Resolve the full observer sequence for `operation`: ancestry walked
    /// base-first, registration order within each layer.
    pub(crate) fn resolved_observers(&self, operation: &str) -> Vec<Arc<dyn Observer>> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(model) = current {
            current = model.inner.parent.clone();
            chain.push(model);
        }
        chain.reverse();

        let mut resolved = Vec::new();
        for model in &chain {
            let registry = model
                .inner
                .observers
                .read()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(list) = registry.get(operation) {
                resolved.extend(list.iter().cloned());
            }
        }
        resolved
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("parent", &self.inner.parent.as_ref().map(|p| p.model_name()))
            .finish()
    }
}

/// Owns named root model definitions.
#[derive(Default)]
pub struct ModelBuilder {
    models: RwLock<HashMap<String, Model>>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a root model with the given properties. Redefining a name
    /// replaces the previous descriptor.
    pub fn define<S>(
        &self,
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (S, PropertyDefinition)>,
    ) -> Model
    where
        S: Into<String>,
    {
        let name = name.into();
        let properties: HashMap<String, PropertyDefinition> = properties
            .into_iter()
            .map(|(key, def)| (key.into(), def))
            .collect();

        let model = Model::new(name.clone(), None, properties);

        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        if models.insert(name.clone(), model.clone()).is_some() {
            tracing::warn!("Model {} redefined, replacing previous definition", name);
        }
        model
    }

    pub fn model(&self, name: &str) -> Option<Model> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}
