use serde::Deserialize;
use serde::Serialize;

use crate::DirectoryError;
use crate::PoolId;
use crate::Rank;
use crate::RankList;
use crate::Result;
use crate::RANK_NONE;

/// Persisted form of one pool's replica directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub pool_id: PoolId,
    /// Requested replica count
    pub target: u32,
    /// Members in order, then sentinel padding. Sized to the ranks placed at
    /// creation, never above `target`.
    pub slots: Vec<u32>,
    /// Leader rank, sentinel when unknown
    pub leader: u32,
    pub version: u64,
}

impl DirectoryRecord {
    pub fn new(
        pool_id: PoolId,
        target: usize,
        capacity: usize,
        members: &RankList,
        leader: Option<Rank>,
        version: u64,
    ) -> Result<Self> {
        if capacity > target {
            return Err(inconsistency(
                pool_id,
                format!("{capacity} slots exceed target {target}"),
            ));
        }
        let slots = members
            .to_slots(capacity)
            .map_err(|v| inconsistency(pool_id, v.to_string()))?;
        Ok(Self {
            pool_id,
            target: target as u32,
            slots,
            leader: leader.map(u32::from).unwrap_or(RANK_NONE),
            version,
        })
    }

    /// Decodes and checks the slot array.
    pub fn members(&self) -> Result<RankList> {
        if self.slots.len() > self.target as usize {
            return Err(inconsistency(
                self.pool_id,
                format!("{} slots recorded for target {}", self.slots.len(), self.target),
            ));
        }
        RankList::from_slots(&self.slots).map_err(|v| inconsistency(self.pool_id, v.to_string()))
    }

    pub fn leader(&self) -> Option<Rank> {
        Rank::new(self.leader)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

fn inconsistency(
    pool_id: PoolId,
    reason: String,
) -> crate::Error {
    DirectoryError::InternalInconsistency { pool_id, reason }.into()
}
