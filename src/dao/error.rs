use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::connector::ConnectorError;
use crate::observer::HookError;
use crate::validate::ValidationError;

use super::instance::Instance;

/// Operation-level error surface of the repository layer.
///
/// All three kinds travel through the same `Result` channel as success; no
/// retry happens anywhere in this layer.
#[derive(Debug, Error, Clone)]
pub enum DaoError {
    /// An observer aborted the notification chain.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The instance or update payload failed model validation (raised after
    /// a successful `before save` notification, save-family operations only).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The storage backend failed; only possible after pre-notification
    /// succeeded.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl DaoError {
    /// The field -> failure-codes map when this is a validation error.
    pub fn validation_codes(&self) -> Option<&HashMap<String, Vec<String>>> {
        match self {
            DaoError::Validation(error) => Some(&error.codes),
            _ => None,
        }
    }
}

/// Partial-failure outcome of bulk operations.
///
/// `errors` is positionally aligned with the inputs; an item that failed
/// still has a corresponding entry in `instances` carrying its un-persisted
/// record.
#[derive(Debug, Clone)]
pub struct BulkErrors {
    pub instances: Vec<Instance>,
    pub errors: Vec<Option<DaoError>>,
}

impl BulkErrors {
    pub fn failed_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }
}

impl fmt::Display for BulkErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} items failed",
            self.failed_count(),
            self.errors.len()
        )
    }
}

impl std::error::Error for BulkErrors {}
