#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::{json, Map, Value};

use datahook::dao::{DaoError, DataSource, Instance, Repository};
use datahook::model::PropertyDefinition;
use datahook::observer::{HookError, NotifyInspector};

/// Keep tracing output available (RUST_LOG-gated) without double-init panics.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Shorthand for building field maps out of `json!` object literals.
pub fn obj(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Fresh in-memory data source with the canonical TestModel: a required
/// `name` and a string `id`.
pub fn test_repository() -> (DataSource, Repository) {
    init_tracing();
    let ds = DataSource::memory();
    let repo = ds.define(
        "TestModel",
        [
            ("name", PropertyDefinition::string().required()),
            ("id", PropertyDefinition::string().id()),
        ],
    );
    (ds, repo)
}

/// Seed the two canonical records with fixed ids "1" and "2".
pub async fn seed(repo: &Repository) -> Result<(Instance, Instance)> {
    let first = repo.create(obj(json!({ "id": "1", "name": "first" }))).await?;
    let second = repo.create(obj(json!({ "id": "2", "name": "second" }))).await?;
    Ok((first, second))
}

/// Names of all stored records, bypassing hooks, in id order.
pub async fn stored_names(repo: &Repository) -> Result<Vec<String>> {
    let found = repo
        .find_with_options(Default::default(), datahook::dao::Options::silent())
        .await?;
    Ok(found
        .iter()
        .map(|i| i.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string())
        .collect())
}

/// Ids of all stored records, bypassing hooks, in id order.
pub async fn stored_ids(repo: &Repository) -> Result<Vec<String>> {
    let found = repo
        .find_with_options(Default::default(), datahook::dao::Options::silent())
        .await?;
    Ok(found
        .iter()
        .map(|i| i.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string())
        .collect())
}

/// Unwrap the observer-raised error out of an operation failure.
pub fn hook_error(error: DaoError) -> HookError {
    match error {
        DaoError::Hook(inner) => inner,
        other => panic!("expected a hook error, got: {}", other),
    }
}

/// Call-order recorder implementing the notify instrumentation seam.
#[derive(Default)]
pub struct RecordingInspector {
    calls: Mutex<Vec<String>>,
}

impl RecordingInspector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl NotifyInspector for RecordingInspector {
    fn on_notify(&self, _model: &str, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }
}
