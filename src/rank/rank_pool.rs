use std::collections::BTreeSet;

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;

use crate::Rank;
use crate::Result;

/// Cluster membership service: the set of live server ranks.
#[cfg_attr(test, automock)]
pub trait RankProvider: Send + Sync + 'static {
    /// Snapshot of currently live ranks, in no particular order
    fn live_ranks(&self) -> Result<Vec<Rank>>;
}

/// Fixed rank set, e.g. from a static server list
#[derive(Debug, Default)]
pub struct StaticRankPool {
    ranks: RwLock<BTreeSet<Rank>>,
}

impl StaticRankPool {
    pub fn new(ranks: impl IntoIterator<Item = Rank>) -> Self {
        Self {
            ranks: RwLock::new(ranks.into_iter().filter(|r| !r.is_none()).collect()),
        }
    }

    /// Ranks `0..count`
    pub fn with_count(count: u32) -> Self {
        Self::new((0..count).filter_map(Rank::new))
    }

    pub fn add(
        &self,
        rank: Rank,
    ) -> bool {
        !rank.is_none() && self.ranks.write().insert(rank)
    }

    pub fn remove(
        &self,
        rank: Rank,
    ) -> bool {
        self.ranks.write().remove(&rank)
    }
}

impl RankProvider for StaticRankPool {
    fn live_ranks(&self) -> Result<Vec<Rank>> {
        Ok(self.ranks.read().iter().copied().collect())
    }
}
