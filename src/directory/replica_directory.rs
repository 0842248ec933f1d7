//! Authoritative, versioned list of service-member ranks for one pool.
//!
//! The directory is the single source of truth for which ranks host a
//! pool's service and which of them was last seen as leader. Membership
//! only shrinks after creation (exclusion); leader marking annotates an
//! existing member. Every successful mutation bumps `version` and is
//! persisted through the [`DirectoryStore`] before it becomes visible.
//!
//! All mutations run under the write half of one `RwLock`, so readers always
//! observe a complete snapshot.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use autometrics::autometrics;
use parking_lot::RwLock;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use crate::DirectoryError;
use crate::DirectoryRecord;
use crate::DirectoryStore;
use crate::Error;
use crate::PoolId;
use crate::QuorumPolicy;
use crate::Rank;
use crate::RankList;
use crate::Result;
use crate::API_SLO;

/// Consistent read-only view of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub pool_id: PoolId,
    pub target: usize,
    pub members: Vec<Rank>,
    pub leader: Option<Rank>,
    pub version: u64,
}

/// Outcome of a successful `mark_leader`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderMark {
    /// Version the mark was applied on top of
    pub previous_version: u64,
    pub version: u64,
}

impl LeaderMark {
    pub fn changed(&self) -> bool {
        self.previous_version != self.version
    }
}

#[derive(Debug, Clone)]
struct DirectoryState {
    target: usize,
    /// Persisted slot count, the number of ranks placed at creation
    slots: usize,
    members: RankList,
    leader: Option<Rank>,
    version: u64,
}

pub struct ReplicaDirectory {
    pool_id: PoolId,
    quorum: QuorumPolicy,
    store: Arc<dyn DirectoryStore>,
    state: RwLock<DirectoryState>,
}

impl Debug for ReplicaDirectory {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ReplicaDirectory")
            .field("pool_id", &self.pool_id)
            .field("members", &state.members)
            .field("version", &state.version)
            .finish()
    }
}

impl ReplicaDirectory {
    /// Builds a fresh directory at version 1 and persists it.
    ///
    /// Returns only after the record has been committed by the store.
    pub(crate) fn create(
        pool_id: PoolId,
        target: usize,
        members: RankList,
        quorum: QuorumPolicy,
        store: Arc<dyn DirectoryStore>,
    ) -> Result<Self> {
        let state = DirectoryState {
            target,
            slots: members.len(),
            members,
            leader: None,
            version: 1,
        };
        check_invariants(pool_id, &state)?;
        store.save(&to_record(pool_id, &state)?)?;

        info!(
            "pool {} directory created: members={:?}, target={}",
            pool_id,
            state.members.as_slice(),
            target
        );
        Ok(Self {
            pool_id,
            quorum,
            store,
            state: RwLock::new(state),
        })
    }

    /// Rebuilds a directory from its persisted record.
    pub fn from_record(
        record: &DirectoryRecord,
        quorum: QuorumPolicy,
        store: Arc<dyn DirectoryStore>,
    ) -> Result<Self> {
        let state = DirectoryState {
            target: record.target as usize,
            slots: record.slots.len(),
            members: record.members()?,
            leader: record.leader(),
            version: record.version,
        };
        check_invariants(record.pool_id, &state)?;

        Ok(Self {
            pool_id: record.pool_id,
            quorum,
            store,
            state: RwLock::new(state),
        })
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Current members in order. Refuses to hand out a corrupted view.
    pub fn members(&self) -> Result<Vec<Rank>> {
        let state = self.state.read();
        check_invariants(self.pool_id, &state)?;
        Ok(state.members.as_slice().to_vec())
    }

    pub fn size(&self) -> usize {
        self.state.read().members.len()
    }

    pub fn target(&self) -> usize {
        self.state.read().target
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    pub fn leader(&self) -> Option<Rank> {
        self.state.read().leader
    }

    pub fn contains(
        &self,
        rank: Rank,
    ) -> bool {
        self.state.read().members.contains(rank)
    }

    pub fn snapshot(&self) -> Result<DirectorySnapshot> {
        let state = self.state.read();
        check_invariants(self.pool_id, &state)?;
        Ok(DirectorySnapshot {
            pool_id: self.pool_id,
            target: state.target,
            members: state.members.as_slice().to_vec(),
            leader: state.leader,
            version: state.version,
        })
    }

    /// Removes `ranks` as one unit.
    ///
    /// Fails with `NotAMember` if any rank is absent and with
    /// `QuorumViolation` if too few members would remain. On any failure,
    /// persistence included, the directory is unchanged.
    ///
    /// Returns the new version.
    #[autometrics(objective = API_SLO)]
    pub fn remove_members(
        &self,
        ranks: &[Rank],
    ) -> Result<u64> {
        if ranks.is_empty() {
            return Err(Error::InvalidArgument("no ranks to remove".into()));
        }
        let removing: HashSet<Rank> = ranks.iter().copied().collect();

        let mut state = self.state.write();
        check_invariants(self.pool_id, &state)?;

        if let Some(rank) = ranks.iter().find(|r| !state.members.contains(**r)) {
            debug!("pool {}: rank {} is not a member, removal rejected", self.pool_id, rank);
            return Err(DirectoryError::NotAMember {
                pool_id: self.pool_id,
                rank: *rank,
            }
            .into());
        }

        let remaining = state.members.len() - removing.len();
        let required = self.quorum.required(state.target);
        if remaining < required {
            return Err(DirectoryError::QuorumViolation {
                pool_id: self.pool_id,
                remaining,
                required,
            }
            .into());
        }

        let kept: Vec<Rank> = state
            .members
            .as_slice()
            .iter()
            .copied()
            .filter(|r| !removing.contains(r))
            .collect();
        let next = DirectoryState {
            target: state.target,
            slots: state.slots,
            members: RankList::new(kept).map_err(|v| self.inconsistency(v.to_string()))?,
            leader: state.leader.filter(|l| !removing.contains(l)),
            version: state.version + 1,
        };

        self.commit(&mut state, next)?;
        info!(
            "pool {} removed {:?}, members now {:?} (version={})",
            self.pool_id,
            ranks,
            state.members.as_slice(),
            state.version
        );
        Ok(state.version)
    }

    /// Records `rank` as the acting leader.
    ///
    /// Marking the rank that is already leader is not a mutation and leaves
    /// the version untouched.
    #[autometrics(objective = API_SLO)]
    pub fn mark_leader(
        &self,
        rank: Rank,
    ) -> Result<LeaderMark> {
        trace!("mark {} as leader of pool {}", rank, self.pool_id);

        let mut state = self.state.write();
        if !state.members.contains(rank) {
            return Err(DirectoryError::NotAMember {
                pool_id: self.pool_id,
                rank,
            }
            .into());
        }

        let previous_version = state.version;
        if state.leader == Some(rank) {
            return Ok(LeaderMark {
                previous_version,
                version: previous_version,
            });
        }

        let next = DirectoryState {
            leader: Some(rank),
            version: previous_version + 1,
            ..state.clone()
        };
        self.commit(&mut state, next)?;

        Ok(LeaderMark {
            previous_version,
            version: state.version,
        })
    }

    /// Drops the persisted record. The in-memory directory stays readable
    /// for holders of an `Arc` until they let go.
    pub(crate) fn purge(&self) -> Result<bool> {
        self.store.remove(self.pool_id)
    }

    fn commit(
        &self,
        state: &mut DirectoryState,
        next: DirectoryState,
    ) -> Result<()> {
        check_invariants(self.pool_id, &next)?;
        if let Err(e) = self.store.save(&to_record(self.pool_id, &next)?) {
            error!(
                "pool {}: failed to persist directory version {}: {:?}",
                self.pool_id, next.version, e
            );
            return Err(e);
        }
        *state = next;
        Ok(())
    }

    fn inconsistency(
        &self,
        reason: String,
    ) -> Error {
        DirectoryError::InternalInconsistency {
            pool_id: self.pool_id,
            reason,
        }
        .into()
    }
}

fn to_record(
    pool_id: PoolId,
    state: &DirectoryState,
) -> Result<DirectoryRecord> {
    DirectoryRecord::new(
        pool_id,
        state.target,
        state.slots,
        &state.members,
        state.leader,
        state.version,
    )
}

fn check_invariants(
    pool_id: PoolId,
    state: &DirectoryState,
) -> Result<()> {
    let fail = |reason: String| -> Result<()> {
        error!("pool {} directory invariant breach: {}", pool_id, reason);
        Err(DirectoryError::InternalInconsistency { pool_id, reason }.into())
    };

    if state.slots > state.target {
        return fail(format!("{} slots exceed target {}", state.slots, state.target));
    }
    if state.members.len() > state.slots {
        return fail(format!(
            "{} members exceed {} slots",
            state.members.len(),
            state.slots
        ));
    }
    let mut seen = HashSet::with_capacity(state.members.len());
    for rank in state.members.as_slice() {
        if rank.is_none() {
            return fail("sentinel stored as member".to_string());
        }
        if !seen.insert(*rank) {
            return fail(format!("duplicate member {rank}"));
        }
    }
    if let Some(leader) = state.leader {
        if !state.members.contains(leader) {
            return fail(format!("leader {leader} is not a member"));
        }
    }
    Ok(())
}
