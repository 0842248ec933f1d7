use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::PoolId;
use crate::Rank;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    /// Permission bits of the new pool
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size_bytes: u64,
    pub server_group: String,
    /// Service replicas wanted, at least one
    pub replica_count: u32,
}

impl CreatePoolRequest {
    pub fn new(
        size_bytes: u64,
        replica_count: u32,
    ) -> Self {
        Self {
            mode: 0o731,
            uid: 0,
            gid: 0,
            size_bytes,
            server_group: "daos_server".to_string(),
            replica_count,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.replica_count == 0 {
            return Err(Error::InvalidArgument("replica count must be >= 1".into()));
        }
        if self.size_bytes == 0 {
            return Err(Error::InvalidArgument("pool size must be > 0".into()));
        }
        if self.server_group.is_empty() {
            return Err(Error::InvalidArgument("server group must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePoolResponse {
    pub pool_id: PoolId,
    /// Realized service members, never longer than `requested`
    pub members: Vec<Rank>,
    pub requested: usize,
}

impl CreatePoolResponse {
    /// Replicas requested but not placed
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.members.len())
    }
}
