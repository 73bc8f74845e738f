// Data-access operation surface: per-model repositories wrapping a storage
// connector with pre/post observer notifications

pub mod datasource;
pub mod error;
pub mod instance;
pub mod repository;

pub use datasource::DataSource;
pub use error::{BulkErrors, DaoError};
pub use instance::Instance;
pub use repository::{Options, Repository};
