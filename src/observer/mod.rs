// Observer system: named hooks notified around persistence operations

pub mod context;
pub mod error;
pub mod notifier;
pub mod traits;

// Re-export core types
pub use context::*;
pub use error::*;
pub use traits::*;
