//! Durable directory records.
//!
//! The pool service directory is persisted as one [`DirectoryRecord`] per
//! pool: poolId -> {target replica count, ordered member ranks, version}.
//! [`DirectoryStore::save`] must not return before the record is durable.

mod mem_store;
mod record;
mod sled_store;
pub use mem_store::*;
pub use record::*;
pub use sled_store::*;


use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::PoolId;
use crate::Result;
use crate::StorageBackend;
use crate::StorageConfig;

#[cfg_attr(test, automock)]
pub trait DirectoryStore: Send + Sync + 'static {
    /// Writes and flushes the record. Returns once it survives a crash.
    fn save(
        &self,
        record: &DirectoryRecord,
    ) -> Result<()>;

    fn load(
        &self,
        pool_id: PoolId,
    ) -> Result<Option<DirectoryRecord>>;

    /// Every persisted record, used on recovery
    fn load_all(&self) -> Result<Vec<DirectoryRecord>>;

    /// Returns true if a record existed
    fn remove(
        &self,
        pool_id: PoolId,
    ) -> Result<bool>;
}

/// Opens the store selected by the storage configuration
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DirectoryStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemDirectoryStore::default())),
        StorageBackend::Sled => Ok(Arc::new(SledDirectoryStore::open(&config.db_path)?)),
    }
}
