use thiserror::Error;

/// Error signaled by an observer to abort the remaining notification chain.
///
/// The first failing observer's error is delivered verbatim to the caller of
/// the notification; observers registered after it never run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("{0}")]
    Aborted(String),
}

impl HookError {
    /// Application-signaled failure, equivalent to calling `next(err)` in a
    /// continuation-passing hook chain.
    pub fn aborted(message: impl Into<String>) -> Self {
        HookError::Aborted(message.into())
    }
}
