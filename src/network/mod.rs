//! Transport seam for the leader-probe RPC.
//!
//! The wire protocol is owned by the transport implementation; the directory
//! core only needs "probe(rank, pool) -> is leader".

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::PoolId;
use crate::Rank;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeaderProbe: Send + Sync + 'static {
    /// Asks `rank` whether it currently leads the service of `pool_id`.
    ///
    /// `Ok(false)` means reachable but not leader. Any error means the rank
    /// could not be reached.
    async fn probe(
        &self,
        rank: Rank,
        pool_id: PoolId,
    ) -> Result<bool>;
}
