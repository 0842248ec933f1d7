//! Finds the acting leader of a pool service by probing its members.
//!
//! Candidates are probed starting from the last recorded leader and then in
//! directory order. Ranks that fail to answer land in a per-pool negative
//! cache, valid for one directory version, and are only retried after every
//! other candidate has been tried. Probing never mutates membership; the
//! only write is the leader mark on success.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::trace;
use tracing::warn;

use super::NegativeCache;
use crate::ConnectionError;
use crate::DirectoryError;
use crate::DirectorySnapshot;
use crate::Error;
use crate::LeaderProbe;
use crate::LocatorConfig;
use crate::PoolId;
use crate::Rank;
use crate::ReplicaDirectory;
use crate::Result;
use crate::LEADER_FAILOVERS;
use crate::LEADER_PROBES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Leader,
    NotLeader,
    Unreachable,
}

pub struct LeaderLocator {
    probe: Arc<dyn LeaderProbe>,
    config: LocatorConfig,
    caches: DashMap<PoolId, NegativeCache>,
}

impl LeaderLocator {
    pub fn new(
        probe: Arc<dyn LeaderProbe>,
        config: LocatorConfig,
    ) -> Self {
        Self {
            probe,
            config,
            caches: DashMap::new(),
        }
    }

    /// Resolves the leader within the configured resolve timeout.
    pub async fn resolve_leader(
        &self,
        directory: &ReplicaDirectory,
    ) -> Result<Rank> {
        self.resolve_leader_within(directory, self.config.resolve_timeout())
            .await
    }

    /// Resolves the leader, giving up with `NoLeaderAvailable` once
    /// `deadline` has elapsed.
    #[instrument(skip(self, directory), fields(pool_id = %directory.pool_id()))]
    pub async fn resolve_leader_within(
        &self,
        directory: &ReplicaDirectory,
        deadline: Duration,
    ) -> Result<Rank> {
        let probed = AtomicUsize::new(0);
        match timeout(deadline, self.probe_candidates(directory, &probed)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "leader resolution for pool {} timed out after {:?}",
                    directory.pool_id(),
                    deadline
                );
                Err(ConnectionError::NoLeaderAvailable {
                    pool_id: directory.pool_id(),
                    probed: probed.load(Ordering::Relaxed),
                }
                .into())
            }
        }
    }

    /// Same as [`resolve_leader_within`](Self::resolve_leader_within) but
    /// abandons probing as soon as `token` is cancelled.
    pub async fn resolve_leader_cancellable(
        &self,
        directory: &ReplicaDirectory,
        deadline: Duration,
        token: &CancellationToken,
    ) -> Result<Rank> {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("leader resolution for pool {} cancelled", directory.pool_id());
                Err(ConnectionError::Cancelled { pool_id: directory.pool_id() }.into())
            }
            result = self.resolve_leader_within(directory, deadline) => result,
        }
    }

    /// Probes a single rank believed to be leader. Unreachable ranks are
    /// remembered in the negative cache.
    pub async fn confirm_leader(
        &self,
        directory: &ReplicaDirectory,
        rank: Rank,
    ) -> bool {
        if !directory.contains(rank) {
            return false;
        }
        match self.probe_once(rank, directory.pool_id()).await {
            ProbeOutcome::Leader => true,
            ProbeOutcome::NotLeader => false,
            ProbeOutcome::Unreachable => {
                self.with_cache(directory.pool_id(), directory.version(), |c| c.insert(rank));
                false
            }
        }
    }

    /// Drops everything remembered about `pool_id`.
    pub fn invalidate(
        &self,
        pool_id: PoolId,
    ) {
        if self.caches.remove(&pool_id).is_some() {
            debug!("negative cache of pool {} invalidated", pool_id);
        }
    }

    /// Ranks currently suspected dead for `pool_id`
    pub fn suspected(
        &self,
        pool_id: PoolId,
    ) -> Vec<Rank> {
        self.caches
            .get(&pool_id)
            .map(|c| c.ranks())
            .unwrap_or_default()
    }

    async fn probe_candidates(
        &self,
        directory: &ReplicaDirectory,
        probed: &AtomicUsize,
    ) -> Result<Rank> {
        let pool_id = directory.pool_id();
        let snapshot = directory.snapshot()?;
        let ordered = candidate_order(&snapshot);

        let (fresh, suspected): (Vec<Rank>, Vec<Rank>) = self.with_cache(pool_id, snapshot.version, |c| {
            c.observe(snapshot.version);
            ordered.iter().partition(|r| !c.contains(**r))
        });
        trace!(
            "pool {}: probing {:?}, suspected dead {:?}",
            pool_id,
            fresh,
            suspected
        );

        for rank in fresh.into_iter().chain(suspected) {
            if !directory.contains(rank) {
                debug!("pool {}: rank {} left the directory, skipping", pool_id, rank);
                LEADER_PROBES.with_label_values(&["skipped"]).inc();
                continue;
            }

            probed.fetch_add(1, Ordering::Relaxed);
            match self.probe_once(rank, pool_id).await {
                ProbeOutcome::Leader => match directory.mark_leader(rank) {
                    Ok(mark) => {
                        self.with_cache(pool_id, snapshot.version, |c| {
                            c.forget(rank);
                            c.carry(mark);
                        });
                        if snapshot.leader.is_some_and(|previous| previous != rank) {
                            LEADER_FAILOVERS.inc();
                            info!(
                                "pool {}: leader moved from {:?} to {}",
                                pool_id, snapshot.leader, rank
                            );
                        }
                        return Ok(rank);
                    }
                    Err(Error::Directory(DirectoryError::NotAMember { .. })) => {
                        debug!("pool {}: leader {} excluded during resolution", pool_id, rank);
                        continue;
                    }
                    Err(e) => return Err(e),
                },
                ProbeOutcome::NotLeader => continue,
                ProbeOutcome::Unreachable => {
                    self.with_cache(pool_id, snapshot.version, |c| c.insert(rank));
                }
            }
        }

        let probed = probed.load(Ordering::Relaxed);
        warn!("pool {}: no leader among {} probed replicas", pool_id, probed);
        Err(ConnectionError::NoLeaderAvailable { pool_id, probed }.into())
    }

    async fn probe_once(
        &self,
        rank: Rank,
        pool_id: PoolId,
    ) -> ProbeOutcome {
        let outcome = match timeout(self.config.probe_timeout(), self.probe.probe(rank, pool_id)).await {
            Ok(Ok(true)) => ProbeOutcome::Leader,
            Ok(Ok(false)) => ProbeOutcome::NotLeader,
            Ok(Err(e)) => {
                debug!("probe of rank {} for pool {} failed: {}", rank, pool_id, e);
                ProbeOutcome::Unreachable
            }
            Err(_) => {
                debug!("probe of rank {} for pool {} timed out", rank, pool_id);
                LEADER_PROBES.with_label_values(&["timeout"]).inc();
                return ProbeOutcome::Unreachable;
            }
        };

        let label = match outcome {
            ProbeOutcome::Leader => "leader",
            ProbeOutcome::NotLeader => "not_leader",
            ProbeOutcome::Unreachable => "unreachable",
        };
        LEADER_PROBES.with_label_values(&[label]).inc();
        outcome
    }

    fn with_cache<R>(
        &self,
        pool_id: PoolId,
        version: u64,
        f: impl FnOnce(&mut NegativeCache) -> R,
    ) -> R {
        let mut cache = self
            .caches
            .entry(pool_id)
            .or_insert_with(|| NegativeCache::new(version, self.config.negative_cache_capacity));
        f(&mut cache)
    }
}

/// Recorded leader first, then the remaining members in directory order
/// wrapping around.
fn candidate_order(snapshot: &DirectorySnapshot) -> Vec<Rank> {
    let members = &snapshot.members;
    let start = snapshot
        .leader
        .and_then(|leader| members.iter().position(|m| *m == leader))
        .unwrap_or(0);
    members[start..].iter().chain(members[..start].iter()).copied().collect()
}

