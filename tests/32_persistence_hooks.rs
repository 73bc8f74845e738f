mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::{json, Value};

use common::{hook_error, obj, seed, test_repository, RecordingInspector};
use datahook::filter::Query;
use datahook::observer::HookError;

// Persistence hooks around the lookup and create operations: find, count,
// create (single and array form) and find_or_create.

type Captured<T> = Arc<Mutex<Option<T>>>;

fn capture<T>() -> Captured<T> {
    Arc::new(Mutex::new(None))
}

// ========================================
// find
// ========================================

#[tokio::test]
async fn find_triggers_query_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let captured: Captured<Query> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("query", move |ctx| {
        *slot.lock().unwrap() = Some(ctx.query_ref().unwrap().clone());
        assert_eq!(ctx.model().model_name(), "TestModel");
        Ok(())
    });

    repo.find(Query::with_where(json!({ "id": "1" }))).await?;

    assert_eq!(
        captured.lock().unwrap().clone(),
        Some(Query::with_where(json!({ "id": "1" })))
    );
    Ok(())
}

#[tokio::test]
async fn find_aborts_when_query_hook_fails() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model()
        .observe_fn("query", |_ctx| Err(HookError::aborted("test error")));

    let error = repo.find(Query::default()).await.unwrap_err();
    assert_eq!(hook_error(error), HookError::aborted("test error"));
    Ok(())
}

#[tokio::test]
async fn find_applies_updates_from_query_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model().observe_fn("query", |ctx| {
        *ctx.query_mut().unwrap() = Query::with_where(json!({ "id": "1" }));
        Ok(())
    });

    let found = repo.find(Query::default()).await?;
    let names: Vec<&str> = found
        .iter()
        .filter_map(|i| i.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["first"]);
    Ok(())
}

// ========================================
// create
// ========================================

#[tokio::test]
async fn create_triggers_before_save_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let captured: Captured<(Option<Value>, Value)> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("before save", move |ctx| {
        let instance = ctx.instance().unwrap();
        *slot.lock().unwrap() = Some((
            instance.id().cloned(),
            instance.get("name").cloned().unwrap_or(Value::Null),
        ));
        Ok(())
    });

    repo.create(obj(json!({ "name": "created" }))).await?;

    // id is not assigned yet in the before-save phase
    assert_eq!(
        captured.lock().unwrap().clone(),
        Some((None, json!("created")))
    );
    Ok(())
}

#[tokio::test]
async fn create_aborts_when_before_save_hook_fails() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model()
        .observe_fn("before save", |_ctx| Err(HookError::aborted("test error")));

    let error = repo.create(obj(json!({ "name": "created" }))).await.unwrap_err();
    assert_eq!(hook_error(error), HookError::aborted("test error"));

    // no storage write happened
    assert_eq!(repo.count(None).await?, 2);
    Ok(())
}

#[tokio::test]
async fn create_applies_updates_from_before_save_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model().observe_fn("before save", |ctx| {
        ctx.instance_mut().unwrap().set("custom", "hook data");
        Ok(())
    });

    let instance = repo.create(obj(json!({ "name": "a-name" }))).await?;
    assert_eq!(instance.get("custom"), Some(&json!("hook data")));

    // the hook-added field was persisted, not just echoed back
    let stored = repo.find_by_id(instance.id().unwrap()).await?.unwrap();
    assert_eq!(stored.get("custom"), Some(&json!("hook data")));
    Ok(())
}

#[tokio::test]
async fn create_sends_before_save_for_each_item_in_an_array() -> Result<()> {
    let (_ds, repo) = test_repository();

    let names: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let slot = names.clone();
    repo.model().observe_fn("before save", move |ctx| {
        let name = ctx.instance().unwrap().get("name").cloned();
        slot.lock()
            .unwrap()
            .push(name.and_then(|v| v.as_str().map(String::from)).unwrap_or_default());
        Ok(())
    });

    repo.create_many(vec![
        obj(json!({ "name": "one" })),
        obj(json!({ "name": "two" })),
    ])
    .await
    .map_err(|e| anyhow::anyhow!("unexpected bulk failure: {}", e))?;

    assert_eq!(*names.lock().unwrap(), vec!["one", "two"]);
    Ok(())
}

#[tokio::test]
async fn create_validates_model_after_before_save_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model().observe_fn("before save", |ctx| {
        ctx.instance_mut().unwrap().set("name", "");
        Ok(())
    });

    let error = repo.create(obj(json!({ "name": "created" }))).await.unwrap_err();
    let codes = error.validation_codes().expect("expected a validation error");
    assert_eq!(codes["name"], vec!["presence"]);

    // validation failed before the connector was called
    assert_eq!(repo.count(None).await?, 2);
    Ok(())
}

#[tokio::test]
async fn create_triggers_after_save_hook() -> Result<()> {
    let (_ds, repo) = test_repository();

    let captured: Captured<(Option<Value>, Value)> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("after save", move |ctx| {
        let instance = ctx.instance().unwrap();
        *slot.lock().unwrap() = Some((
            instance.id().cloned(),
            instance.get("name").cloned().unwrap_or(Value::Null),
        ));
        Ok(())
    });

    let instance = repo.create(obj(json!({ "name": "created" }))).await?;

    assert_eq!(
        captured.lock().unwrap().clone(),
        Some((instance.id().cloned(), json!("created")))
    );
    Ok(())
}

#[tokio::test]
async fn create_aborts_when_after_save_hook_fails() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model()
        .observe_fn("after save", |_ctx| Err(HookError::aborted("test error")));

    let error = repo.create(obj(json!({ "name": "created" }))).await.unwrap_err();
    assert_eq!(hook_error(error), HookError::aborted("test error"));

    // the storage write already happened; there is no rollback
    assert_eq!(repo.count(None).await?, 3);
    Ok(())
}

#[tokio::test]
async fn create_applies_updates_from_after_save_hook() -> Result<()> {
    let (_ds, repo) = test_repository();

    repo.model().observe_fn("after save", |ctx| {
        ctx.instance_mut().unwrap().set("custom", "hook data");
        Ok(())
    });

    let instance = repo.create(obj(json!({ "name": "a-name" }))).await?;
    assert_eq!(instance.get("custom"), Some(&json!("hook data")));
    Ok(())
}

#[tokio::test]
async fn create_emits_after_save_when_some_models_were_not_saved() -> Result<()> {
    let (_ds, repo) = test_repository();

    repo.model().observe_fn("before save", |ctx| {
        if ctx.instance().unwrap().get("name") == Some(&json!("fail")) {
            Err(HookError::aborted("test error"))
        } else {
            Ok(())
        }
    });

    let saved: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let slot = saved.clone();
    repo.model().observe_fn("after save", move |ctx| {
        let name = ctx.instance().unwrap().get("name").cloned();
        slot.lock()
            .unwrap()
            .push(name.and_then(|v| v.as_str().map(String::from)).unwrap_or_default());
        Ok(())
    });

    let bulk = repo
        .create_many(vec![obj(json!({ "name": "ok" })), obj(json!({ "name": "fail" }))])
        .await
        .unwrap_err();

    // per-item errors are positionally aligned with the inputs
    assert_eq!(bulk.errors.len(), 2);
    assert!(bulk.errors[0].is_none());
    let failed = bulk.errors[1].clone().unwrap();
    assert_eq!(hook_error(failed), HookError::aborted("test error"));

    // the result list still carries an entry for the failed item
    let names: Vec<&str> = bulk
        .instances
        .iter()
        .filter_map(|i| i.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["ok", "fail"]);

    // after save fired only for the item that was written
    assert_eq!(*saved.lock().unwrap(), vec!["ok"]);
    Ok(())
}

// ========================================
// find_or_create
// ========================================

#[tokio::test]
async fn find_or_create_triggers_query_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let captured: Captured<Query> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("query", move |ctx| {
        *slot.lock().unwrap() = Some(ctx.query_ref().unwrap().clone());
        Ok(())
    });

    repo.find_or_create(
        Query::with_where(json!({ "name": "new-record" })),
        obj(json!({ "name": "new-record" })),
    )
    .await?;

    // the lookup criteria carry explicit pagination
    let expected = Query {
        where_clause: Some(json!({ "name": "new-record" })),
        order: None,
        limit: Some(1),
        offset: Some(0),
        skip: Some(0),
    };
    assert_eq!(captured.lock().unwrap().clone(), Some(expected));
    Ok(())
}

#[tokio::test]
async fn find_or_create_triggers_before_save_when_not_found() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let captured: Captured<(Option<Value>, Value)> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("before save", move |ctx| {
        let instance = ctx.instance().unwrap();
        *slot.lock().unwrap() = Some((
            instance.id().cloned(),
            instance.get("name").cloned().unwrap_or(Value::Null),
        ));
        Ok(())
    });

    let (_instance, created) = repo
        .find_or_create(
            Query::with_where(json!({ "name": "new-record" })),
            obj(json!({ "name": "new-record" })),
        )
        .await?;

    assert!(created);
    assert_eq!(
        captured.lock().unwrap().clone(),
        Some((None, json!("new-record")))
    );
    Ok(())
}

#[tokio::test]
async fn find_or_create_validates_model_after_before_save_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model().observe_fn("before save", |ctx| {
        ctx.instance_mut().unwrap().set("name", "");
        Ok(())
    });

    let error = repo
        .find_or_create(
            Query::with_where(json!({ "name": "new-record" })),
            obj(json!({ "name": "new-record" })),
        )
        .await
        .unwrap_err();

    let codes = error.validation_codes().expect("expected a validation error");
    assert_eq!(codes["name"], vec!["presence"]);
    Ok(())
}

#[tokio::test]
async fn find_or_create_triggers_hooks_in_order_when_not_found() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let inspector = RecordingInspector::new();
    repo.model().set_inspector(inspector.clone());

    repo.find_or_create(
        Query::with_where(json!({ "name": "new-record" })),
        obj(json!({ "name": "new-record" })),
    )
    .await?;

    assert_eq!(inspector.calls(), vec!["query", "before save", "after save"]);
    Ok(())
}

#[tokio::test]
async fn find_or_create_aborts_when_query_hook_fails() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model()
        .observe_fn("query", |_ctx| Err(HookError::aborted("test error")));

    let error = repo
        .find_or_create(
            Query::with_where(json!({ "id": "does-not-exist" })),
            obj(json!({ "name": "does-not-exist" })),
        )
        .await
        .unwrap_err();

    assert_eq!(hook_error(error), HookError::aborted("test error"));
    Ok(())
}

#[tokio::test]
async fn find_or_create_aborts_when_before_save_hook_fails() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model()
        .observe_fn("before save", |_ctx| Err(HookError::aborted("test error")));

    let error = repo
        .find_or_create(
            Query::with_where(json!({ "id": "does-not-exist" })),
            obj(json!({ "name": "does-not-exist" })),
        )
        .await
        .unwrap_err();

    assert_eq!(hook_error(error), HookError::aborted("test error"));
    Ok(())
}

#[tokio::test]
async fn find_or_create_triggers_after_save_when_not_found() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let captured: Captured<(Option<Value>, Value)> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("after save", move |ctx| {
        let instance = ctx.instance().unwrap();
        *slot.lock().unwrap() = Some((
            instance.id().cloned(),
            instance.get("name").cloned().unwrap_or(Value::Null),
        ));
        Ok(())
    });

    let (instance, created) = repo
        .find_or_create(
            Query::with_where(json!({ "name": "new name" })),
            obj(json!({ "name": "new name" })),
        )
        .await?;

    assert!(created);
    assert_eq!(
        captured.lock().unwrap().clone(),
        Some((instance.id().cloned(), json!("new name")))
    );
    Ok(())
}

#[tokio::test]
async fn find_or_create_does_not_trigger_after_save_when_found() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let fired = Arc::new(Mutex::new(false));
    let slot = fired.clone();
    repo.model().observe_fn("after save", move |_ctx| {
        *slot.lock().unwrap() = true;
        Ok(())
    });

    let (instance, created) = repo
        .find_or_create(
            Query::with_where(json!({ "id": "1" })),
            obj(json!({ "name": "first" })),
        )
        .await?;

    assert!(!created);
    assert_eq!(instance.get("name"), Some(&json!("first")));
    assert!(!*fired.lock().unwrap(), "after save must not fire on find");
    Ok(())
}

// ========================================
// count
// ========================================

#[tokio::test]
async fn count_triggers_query_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    let captured: Captured<Query> = capture();
    let slot = captured.clone();
    repo.model().observe_fn("query", move |ctx| {
        *slot.lock().unwrap() = Some(ctx.query_ref().unwrap().clone());
        Ok(())
    });

    repo.count(Some(json!({ "id": "1" }))).await?;

    assert_eq!(
        captured.lock().unwrap().clone(),
        Some(Query::with_where(json!({ "id": "1" })))
    );
    Ok(())
}

#[tokio::test]
async fn count_applies_updates_from_query_hook() -> Result<()> {
    let (_ds, repo) = test_repository();
    seed(&repo).await?;

    repo.model().observe_fn("query", |ctx| {
        ctx.query_mut().unwrap().where_clause = Some(json!({ "id": "1" }));
        Ok(())
    });

    assert_eq!(repo.count(None).await?, 1);
    Ok(())
}
