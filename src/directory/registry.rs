use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::PoolError;
use crate::PoolId;
use crate::ReplicaDirectory;
use crate::Result;

/// Live directories by pool. Each directory is its own unit of locking.
#[derive(Debug, Default)]
pub struct DirectoryRegistry {
    directories: DashMap<PoolId, Arc<ReplicaDirectory>>,
}

impl DirectoryRegistry {
    pub fn insert(
        &self,
        directory: Arc<ReplicaDirectory>,
    ) -> Result<()> {
        match self.directories.entry(directory.pool_id()) {
            Entry::Occupied(e) => Err(PoolError::AlreadyExists(*e.key()).into()),
            Entry::Vacant(e) => {
                e.insert(directory);
                Ok(())
            }
        }
    }

    pub fn get(
        &self,
        pool_id: PoolId,
    ) -> Result<Arc<ReplicaDirectory>> {
        self.directories
            .get(&pool_id)
            .map(|d| d.clone())
            .ok_or_else(|| PoolError::PoolNotFound(pool_id).into())
    }

    pub fn remove(
        &self,
        pool_id: PoolId,
    ) -> Option<Arc<ReplicaDirectory>> {
        self.directories.remove(&pool_id).map(|(_, d)| d)
    }

    pub fn contains(
        &self,
        pool_id: PoolId,
    ) -> bool {
        self.directories.contains_key(&pool_id)
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.directories.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}
