use std::collections::VecDeque;

use crate::LeaderMark;
use crate::Rank;

/// Ranks that failed to answer a probe, valid for one directory version.
///
/// Bounded: when full, the oldest suspect is forgotten first.
#[derive(Debug)]
pub(crate) struct NegativeCache {
    version: u64,
    capacity: usize,
    dead: VecDeque<Rank>,
}

impl NegativeCache {
    pub(crate) fn new(
        version: u64,
        capacity: usize,
    ) -> Self {
        Self {
            version,
            capacity: capacity.max(1),
            dead: VecDeque::new(),
        }
    }

    /// Clears the cache if the directory moved on to another version.
    pub(crate) fn observe(
        &mut self,
        version: u64,
    ) {
        if version != self.version {
            self.dead.clear();
            self.version = version;
        }
    }

    /// Follows a leader mark made by the locator itself, which changes the
    /// version but not the membership the cache was built against.
    pub(crate) fn carry(
        &mut self,
        mark: LeaderMark,
    ) {
        if self.version == mark.previous_version {
            self.version = mark.version;
        } else {
            self.observe(mark.version);
        }
    }

    pub(crate) fn insert(
        &mut self,
        rank: Rank,
    ) {
        if self.dead.contains(&rank) {
            return;
        }
        if self.dead.len() == self.capacity {
            self.dead.pop_front();
        }
        self.dead.push_back(rank);
    }

    pub(crate) fn forget(
        &mut self,
        rank: Rank,
    ) {
        self.dead.retain(|r| *r != rank);
    }

    pub(crate) fn contains(
        &self,
        rank: Rank,
    ) -> bool {
        self.dead.contains(&rank)
    }

    pub(crate) fn ranks(&self) -> Vec<Rank> {
        self.dead.iter().copied().collect()
    }
}
