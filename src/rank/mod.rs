//! Server ranks and rank lists.
//!
//! A [`Rank`] names one server process. [`RankList`] is the slot-array form
//! used in persisted records: real ranks first, then [`RANK_NONE`] padding.
//! The padding never counts towards the list length.

mod rank_pool;
pub use rank_pool::*;


use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::RANK_NONE;

/// Integer identifier of a cluster server process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(u32);

impl Rank {
    /// Sentinel for "no rank"
    pub const NONE: Rank = Rank(RANK_NONE);

    /// Wraps a raw rank. Returns `None` for the sentinel value.
    pub fn new(raw: u32) -> Option<Self> {
        if raw == RANK_NONE {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == RANK_NONE
    }
}

impl From<Rank> for u32 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Why a slot array could not be turned into a rank list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankListViolation {
    Duplicate(Rank),
    /// The sentinel stored as a list entry
    Sentinel { slot: usize },
    /// A real rank found after the first sentinel slot
    RankAfterSentinel { slot: usize },
    TooLong { len: usize, capacity: usize },
}

impl fmt::Display for RankListViolation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            RankListViolation::Duplicate(rank) => write!(f, "duplicate rank {rank}"),
            RankListViolation::Sentinel { slot } => write!(f, "sentinel stored in slot {slot}"),
            RankListViolation::RankAfterSentinel { slot } => {
                write!(f, "rank found in slot {slot} after sentinel")
            }
            RankListViolation::TooLong { len, capacity } => {
                write!(f, "{len} ranks exceed capacity {capacity}")
            }
        }
    }
}

/// Ordered, duplicate-free list of ranks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankList {
    ranks: Vec<Rank>,
}

impl RankList {
    pub fn new(ranks: Vec<Rank>) -> std::result::Result<Self, RankListViolation> {
        let mut seen = HashSet::with_capacity(ranks.len());
        for (slot, rank) in ranks.iter().enumerate() {
            if rank.is_none() {
                return Err(RankListViolation::Sentinel { slot });
            }
            if !seen.insert(*rank) {
                return Err(RankListViolation::Duplicate(*rank));
            }
        }
        Ok(Self { ranks })
    }

    /// Parses a fixed-capacity slot array.
    ///
    /// The list ends at the first sentinel; every later slot must also be
    /// the sentinel.
    pub fn from_slots(slots: &[u32]) -> std::result::Result<Self, RankListViolation> {
        let len = slots.iter().position(|raw| *raw == RANK_NONE).unwrap_or(slots.len());

        if let Some(offset) = slots[len..].iter().position(|raw| *raw != RANK_NONE) {
            return Err(RankListViolation::RankAfterSentinel { slot: len + offset });
        }

        let ranks = slots[..len].iter().map(|raw| Rank(*raw)).collect();
        Self::new(ranks)
    }

    /// Renders the list into `capacity` slots, padding with the sentinel.
    pub fn to_slots(
        &self,
        capacity: usize,
    ) -> std::result::Result<Vec<u32>, RankListViolation> {
        if self.ranks.len() > capacity {
            return Err(RankListViolation::TooLong {
                len: self.ranks.len(),
                capacity,
            });
        }
        let mut slots: Vec<u32> = self.ranks.iter().map(|r| r.get()).collect();
        slots.resize(capacity, RANK_NONE);
        Ok(slots)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn contains(
        &self,
        rank: Rank,
    ) -> bool {
        self.ranks.contains(&rank)
    }

    pub fn as_slice(&self) -> &[Rank] {
        &self.ranks
    }

    pub fn into_vec(self) -> Vec<Rank> {
        self.ranks
    }
}
