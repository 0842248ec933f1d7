use dashmap::DashMap;

use super::DirectoryRecord;
use super::DirectoryStore;
use crate::PoolId;
use crate::Result;

/// Volatile store for tests and single-process deployments
#[derive(Debug, Default)]
pub struct MemDirectoryStore {
    records: DashMap<PoolId, DirectoryRecord>,
}

impl DirectoryStore for MemDirectoryStore {
    fn save(
        &self,
        record: &DirectoryRecord,
    ) -> Result<()> {
        self.records.insert(record.pool_id, record.clone());
        Ok(())
    }

    fn load(
        &self,
        pool_id: PoolId,
    ) -> Result<Option<DirectoryRecord>> {
        Ok(self.records.get(&pool_id).map(|r| r.clone()))
    }

    fn load_all(&self) -> Result<Vec<DirectoryRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    fn remove(
        &self,
        pool_id: PoolId,
    ) -> Result<bool> {
        Ok(self.records.remove(&pool_id).is_some())
    }
}
