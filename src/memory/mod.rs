//! Record storage: the [`MemoryStore`](store::MemoryStore) contract and its two
//! backends. The backend is chosen once at startup via [`create_store`].

pub mod in_memory;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod types;

use anyhow::Result;
use std::sync::Arc;

use crate::config::KitchenConfig;
use store::MemoryStore;

/// Create the configured store backend.
///
/// `"memory"` keeps records in-process; `"sqlite"` opens (or creates) the
/// database at `storage.db_path`.
pub fn create_store(config: &KitchenConfig) -> Result<Arc<dyn MemoryStore>> {
    match config.storage.backend.as_str() {
        "memory" => Ok(Arc::new(in_memory::InMemoryStore::new())),
        "sqlite" => {
            let db_path = config.resolved_db_path();
            let store = sqlite::SqliteStore::open(&db_path)?;
            tracing::info!(db = %db_path.display(), "sqlite store ready");
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown storage backend: {other}. Supported: memory, sqlite"),
    }
}
