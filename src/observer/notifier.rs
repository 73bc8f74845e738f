use std::time::Instant;

use crate::model::Model;
use crate::observer::context::HookContext;
use crate::observer::error::HookError;

/// Run the observer chain for one operation on one model.
///
/// Resolution walks the model's ancestry base-first, so inherited observers
/// run before the model's own, in registration order within each layer.
/// Observers run strictly sequentially: the next one starts only after the
/// previous future resolved. There is no timeout here - an observer that
/// never completes stalls the chain indefinitely, and no cancellation signal
/// exists once a chain has started.
///
/// The chain always yields to the scheduler at least once, so callers get the
/// same asynchronous completion contract whether or not any observer is
/// registered.
pub(crate) async fn run_chain(
    model: &Model,
    operation: &str,
    ctx: &mut HookContext,
) -> Result<(), HookError> {
    if let Some(inspector) = model.inspector() {
        inspector.on_notify(model.model_name(), operation);
    }

    let observers = model.resolved_observers(operation);

    // Consistent concurrency contract regardless of observer count: never
    // complete on the caller's own poll without yielding.
    tokio::task::yield_now().await;

    if observers.is_empty() {
        tracing::trace!(
            "No observers for operation '{}' on model {}",
            operation,
            model.model_name()
        );
        return Ok(());
    }

    tracing::debug!(
        "Notifying '{}' on model {} with {} observers",
        operation,
        model.model_name(),
        observers.len()
    );

    let warn_after = crate::config::CONFIG.notify.slow_observer_warn_ms;

    for (position, observer) in observers.iter().enumerate() {
        let started = Instant::now();

        match observer.observe(ctx).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                if elapsed.as_millis() as u64 >= warn_after {
                    tracing::warn!(
                        "Observer {} for '{}' on {} completed slowly in {:?}",
                        position,
                        operation,
                        model.model_name(),
                        elapsed
                    );
                } else {
                    tracing::trace!(
                        "Observer {} for '{}' on {} completed in {:?}",
                        position,
                        operation,
                        model.model_name(),
                        elapsed
                    );
                }
            }
            Err(error) => {
                // Context mutations applied by earlier observers stay in
                // place; the caller's error branch sees them if it looks.
                tracing::warn!(
                    "Observer {} for '{}' on {} failed: {}",
                    position,
                    operation,
                    model.model_name(),
                    error
                );
                return Err(error);
            }
        }
    }

    Ok(())
}
