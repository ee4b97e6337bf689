pub mod config;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod report;
pub mod store;
pub mod sync;

use crate::config::StorageConfig;
use crate::errors::Result;
use crate::fetch::RemoteSource;
use crate::store::{EntityStore, SqliteStore};
use crate::sync::Reconciler;
use std::sync::Arc;

/// The main entry point for the `nstorage` library.
///
/// `NStorage` owns the local content store that remote sources are mirrored
/// into. It encapsulates:
/// - A SQLite-backed entity store (`SqliteStore`) holding courses, good
///   practices and discussions, one table per entity type.
/// - The factory for the reconciliation engine (`Reconciler`) that keeps the
///   store in line with an authoritative `RemoteSource`.
///
/// # Example
///
/// ```rust,no_run
/// use nstorage::{NStorage, config::StorageConfig};
/// use tempfile::tempdir;
///
/// #[tokio::main]
/// async fn main() {
///     let dir = tempdir().unwrap();
///     let config = StorageConfig::new(dir.path());
///     let storage = NStorage::new(config).await.unwrap();
///
///     // Now you can hand storage.store to a Reconciler.
/// }
/// ```
pub struct NStorage {
    pub config: StorageConfig,
    pub store: Arc<SqliteStore>,
}

impl NStorage {
    /// Creates a new instance of NStorage and initializes it.
    ///
    /// This will:
    /// 1. Create the parent directory of the database file.
    /// 2. Open a connection to the SQLite store and initialize its schema.
    pub async fn new(config: StorageConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let store = Arc::new(SqliteStore::new(&config)?);
        store.initialize_schema()?;

        Ok(Self { config, store })
    }

    /// Builds a reconciliation engine that mirrors `source` into this store.
    pub fn synchronizer(&self, source: Arc<dyn RemoteSource>) -> Reconciler {
        let store: Arc<dyn EntityStore> = self.store.clone();
        Reconciler::new(store, source)
    }
}
