use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::observer::context::HookContext;
use crate::observer::error::HookError;

/// Well-known operation names notified by the repository layer.
///
/// Application code may notify any other name through the public
/// `Model::observe` / `Model::notify` API; these constants are only the
/// contract surface the built-in CRUD operations use.
pub mod operations {
    pub const QUERY: &str = "query";
    pub const BEFORE_SAVE: &str = "before save";
    pub const AFTER_SAVE: &str = "after save";
    pub const AFTER_DELETE: &str = "after delete";
}

/// A callback invoked during notification for a given operation name.
///
/// Observers run strictly sequentially within one notification and receive
/// the chain's single shared context; mutations are visible to later
/// observers and to the operation that resumes after the chain completes.
/// Returning `Err` stops the chain immediately.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn observe(&self, ctx: &mut HookContext) -> Result<(), HookError>;
}

/// Adapter lifting a plain synchronous closure into an [`Observer`].
///
/// Most hooks only inspect or mutate the context; this keeps them free of
/// boxed-future boilerplate. Use [`AsyncFnObserver`] when the hook needs to
/// await.
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(&mut HookContext) -> Result<(), HookError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

#[async_trait]
impl<F> Observer for FnObserver<F>
where
    F: Fn(&mut HookContext) -> Result<(), HookError> + Send + Sync,
{
    async fn observe(&self, ctx: &mut HookContext) -> Result<(), HookError> {
        (self.0)(ctx)
    }
}

/// Adapter lifting an async closure (returning a boxed future borrowing the
/// context) into an [`Observer`].
pub struct AsyncFnObserver<F>(F);

impl<F> AsyncFnObserver<F>
where
    F: for<'a> Fn(&'a mut HookContext) -> BoxFuture<'a, Result<(), HookError>> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

#[async_trait]
impl<F> Observer for AsyncFnObserver<F>
where
    F: for<'a> Fn(&'a mut HookContext) -> BoxFuture<'a, Result<(), HookError>> + Send + Sync,
{
    async fn observe(&self, ctx: &mut HookContext) -> Result<(), HookError> {
        (self.0)(ctx).await
    }
}

/// Call-order observability for notifications.
///
/// An inspector registered on a model is invoked at the start of every
/// notification on that model, before any observer runs. This is the
/// instrumentation seam for asserting hook order in tests, instead of
/// swapping out a notify method at runtime.
pub trait NotifyInspector: Send + Sync {
    fn on_notify(&self, model: &str, operation: &str);
}
