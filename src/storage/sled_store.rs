use std::path::Path;

use tracing::debug;
use tracing::error;
use tracing::info;

use super::DirectoryRecord;
use super::DirectoryStore;
use crate::PoolId;
use crate::Result;
use crate::DIRECTORY_TREE;

#[derive(Clone)]
pub struct SledDirectoryStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl std::fmt::Debug for SledDirectoryStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledDirectoryStore")
            .field("tree_len", &self.tree.len())
            .finish()
    }
}

impl SledDirectoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        info!("opening directory store at {}", path.display());
        let db = sled::open(path)?;
        Self::new(db)
    }

    pub fn new(db: sled::Db) -> Result<Self> {
        let tree = db.open_tree(DIRECTORY_TREE)?;
        Ok(Self { db, tree })
    }
}

impl DirectoryStore for SledDirectoryStore {
    fn save(
        &self,
        record: &DirectoryRecord,
    ) -> Result<()> {
        let value = record.encode()?;
        self.tree.insert(record.pool_id.as_bytes(), value)?;

        match self.tree.flush() {
            Ok(bytes) => {
                debug!(
                    "directory record of pool {} flushed (version={}, bytes={})",
                    record.pool_id, record.version, bytes
                );
                Ok(())
            }
            Err(e) => {
                error!("failed to flush directory record of pool {}: {}", record.pool_id, e);
                Err(e.into())
            }
        }
    }

    fn load(
        &self,
        pool_id: PoolId,
    ) -> Result<Option<DirectoryRecord>> {
        match self.tree.get(pool_id.as_bytes())? {
            Some(ivec) => Ok(Some(DirectoryRecord::decode(&ivec)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<Vec<DirectoryRecord>> {
        let mut records = Vec::with_capacity(self.tree.len());
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            records.push(DirectoryRecord::decode(&value)?);
        }
        Ok(records)
    }

    fn remove(
        &self,
        pool_id: PoolId,
    ) -> Result<bool> {
        let existed = self.tree.remove(pool_id.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }
}
