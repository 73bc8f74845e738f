use serde_json::{Map, Value};

use crate::dao::instance::Instance;
use crate::filter::Query;
use crate::model::Model;

/// Operation-scoped mutable context passed through one notification chain.
///
/// The context is created immediately before a notification and discarded
/// immediately after; it is never cloned between observers. The model handle
/// is common to every operation, the payload is a tagged variant carrying
/// only the fields relevant to the notified operation:
///
/// - `query`: a criteria descriptor (`query` hook)
/// - `instance`: a single in-progress record (`before save` / `after save`)
/// - `where` + `data`: a partial-update payload (`before save` on
///   attribute updates)
/// - `where`: delete criteria (`after delete`)
/// - custom: an arbitrary JSON value for application-defined operations
#[derive(Debug)]
pub struct HookContext {
    model: Model,
    payload: Payload,
}

#[derive(Debug)]
pub(crate) enum Payload {
    Query { query: Query },
    Save { instance: Instance },
    Update { where_clause: Value, data: Map<String, Value> },
    Delete { where_clause: Value },
    Custom { data: Value },
}

impl HookContext {
    pub fn query(model: Model, query: Query) -> Self {
        Self {
            model,
            payload: Payload::Query { query },
        }
    }

    pub fn save(model: Model, instance: Instance) -> Self {
        Self {
            model,
            payload: Payload::Save { instance },
        }
    }

    pub fn update(model: Model, where_clause: Value, data: Map<String, Value>) -> Self {
        Self {
            model,
            payload: Payload::Update { where_clause, data },
        }
    }

    pub fn delete(model: Model, where_clause: Value) -> Self {
        Self {
            model,
            payload: Payload::Delete { where_clause },
        }
    }

    /// Context for application-defined operation names notified through the
    /// public `Model::notify` API.
    pub fn custom(model: Model, data: Value) -> Self {
        Self {
            model,
            payload: Payload::Custom { data },
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    // === Payload accessors ===
    //
    // Observers mutate the context through these; the payload variant itself
    // is fixed for the lifetime of the notification, so the operation wrapper
    // can rely on getting the same shape back that it put in.

    pub fn query_ref(&self) -> Option<&Query> {
        match &self.payload {
            Payload::Query { query } => Some(query),
            _ => None,
        }
    }

    pub fn query_mut(&mut self) -> Option<&mut Query> {
        match &mut self.payload {
            Payload::Query { query } => Some(query),
            _ => None,
        }
    }

    pub fn instance(&self) -> Option<&Instance> {
        match &self.payload {
            Payload::Save { instance } => Some(instance),
            _ => None,
        }
    }

    pub fn instance_mut(&mut self) -> Option<&mut Instance> {
        match &mut self.payload {
            Payload::Save { instance } => Some(instance),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        match &self.payload {
            Payload::Update { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut Map<String, Value>> {
        match &mut self.payload {
            Payload::Update { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn where_clause(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Update { where_clause, .. } | Payload::Delete { where_clause } => {
                Some(where_clause)
            }
            _ => None,
        }
    }

    pub fn where_clause_mut(&mut self) -> Option<&mut Value> {
        match &mut self.payload {
            Payload::Update { where_clause, .. } | Payload::Delete { where_clause } => {
                Some(where_clause)
            }
            _ => None,
        }
    }

    pub fn custom_data(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Custom { data } => Some(data),
            _ => None,
        }
    }

    pub fn custom_data_mut(&mut self) -> Option<&mut Value> {
        match &mut self.payload {
            Payload::Custom { data } => Some(data),
            _ => None,
        }
    }

    // === Consumers for the operation wrappers ===
    //
    // Only the crate builds contexts for CRUD notifications, and observers
    // cannot change the payload variant, so these unwrap the variant that was
    // put in.

    pub(crate) fn into_query(self) -> Query {
        match self.payload {
            Payload::Query { query } => query,
            _ => unreachable!("query context cannot change payload variant"),
        }
    }

    pub(crate) fn into_instance(self) -> Instance {
        match self.payload {
            Payload::Save { instance } => instance,
            _ => unreachable!("save context cannot change payload variant"),
        }
    }

    pub(crate) fn into_update(self) -> (Value, Map<String, Value>) {
        match self.payload {
            Payload::Update { where_clause, data } => (where_clause, data),
            _ => unreachable!("update context cannot change payload variant"),
        }
    }
}
