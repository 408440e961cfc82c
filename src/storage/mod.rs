//! Storage backends
//!
//! The canonical content store and the pipeline staging store are separate
//! transactional domains behind the `ContentStore` and `StagingStore`
//! traits. The primary implementations are SQLite-backed.

mod content;
mod staging;
mod traits;

pub use content::SqliteContentStore;
pub use staging::SqliteStagingStore;
pub use traits::{ContentStore, OpenStore, StagingStore, StorageError, StorageResult};
