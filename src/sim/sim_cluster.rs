use std::collections::BTreeSet;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;

use crate::ConnectionError;
use crate::CreatePoolRequest;
use crate::LeaderProbe;
use crate::PoolError;
use crate::PoolId;
use crate::PoolProvisioner;
use crate::Rank;
use crate::RankProvider;
use crate::Result;

#[derive(Debug)]
struct SimPool {
    size_bytes: u64,
    replicas: Vec<Rank>,
    leader: Option<Rank>,
}

#[derive(Debug, Default)]
struct SimState {
    live: BTreeSet<Rank>,
    dead: BTreeSet<Rank>,
    pools: HashMap<PoolId, SimPool>,
}

impl SimState {
    fn used_bytes(&self) -> u64 {
        self.pools.values().map(|p| p.size_bytes).sum()
    }
}

#[derive(Debug, Default)]
pub struct SimCluster {
    state: Mutex<SimState>,
    probes: DashMap<Rank, usize>,
    probe_latency: Duration,
    capacity: Option<u64>,
}

impl SimCluster {
    /// Cluster with live ranks `0..count`
    pub fn new(count: u32) -> Self {
        let cluster = Self::default();
        cluster.state.lock().live = (0..count).filter_map(Rank::new).collect();
        cluster
    }

    /// Every probe sleeps for `latency` before answering
    pub fn with_probe_latency(
        mut self,
        latency: Duration,
    ) -> Self {
        self.probe_latency = latency;
        self
    }

    /// Total bytes the cluster can hand out across pools
    pub fn with_capacity(
        mut self,
        bytes: u64,
    ) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Stops `rank`. Pools it led elect the first surviving replica.
    /// Returns false if the rank was not live.
    pub fn kill(
        &self,
        rank: Rank,
    ) -> bool {
        let mut state = self.state.lock();
        if !state.live.remove(&rank) {
            return false;
        }
        state.dead.insert(rank);

        let SimState { live, pools, .. } = &mut *state;
        for (pool_id, pool) in pools.iter_mut() {
            if pool.leader == Some(rank) {
                pool.leader = pool.replicas.iter().copied().find(|r| live.contains(r));
                info!("sim: pool {} leader {} killed, new leader {:?}", pool_id, rank, pool.leader);
            }
        }
        true
    }

    /// Brings a killed rank back. It rejoins as a follower.
    pub fn restart(
        &self,
        rank: Rank,
    ) -> bool {
        let mut state = self.state.lock();
        if !state.dead.remove(&rank) {
            return false;
        }
        state.live.insert(rank);
        true
    }

    pub fn is_live(
        &self,
        rank: Rank,
    ) -> bool {
        self.state.lock().live.contains(&rank)
    }

    pub fn leader_of(
        &self,
        pool_id: PoolId,
    ) -> Option<Rank> {
        self.state.lock().pools.get(&pool_id).and_then(|p| p.leader)
    }

    /// Moves leadership of `pool_id` to a live replica.
    pub fn transfer_leadership(
        &self,
        pool_id: PoolId,
        rank: Rank,
    ) -> bool {
        let mut state = self.state.lock();
        let live = state.live.contains(&rank);
        match state.pools.get_mut(&pool_id) {
            Some(pool) if live && pool.replicas.contains(&rank) => {
                pool.leader = Some(rank);
                true
            }
            _ => false,
        }
    }

    pub fn replicas_of(
        &self,
        pool_id: PoolId,
    ) -> Vec<Rank> {
        self.state
            .lock()
            .pools
            .get(&pool_id)
            .map(|p| p.replicas.clone())
            .unwrap_or_default()
    }

    pub fn pool_count(&self) -> usize {
        self.state.lock().pools.len()
    }

    /// Probes received by `rank` since the last reset
    pub fn probe_count(
        &self,
        rank: Rank,
    ) -> usize {
        self.probes.get(&rank).map(|c| *c).unwrap_or(0)
    }

    pub fn reset_probe_counts(&self) {
        self.probes.clear();
    }
}

impl RankProvider for SimCluster {
    fn live_ranks(&self) -> Result<Vec<Rank>> {
        Ok(self.state.lock().live.iter().copied().collect())
    }
}

#[async_trait]
impl LeaderProbe for SimCluster {
    async fn probe(
        &self,
        rank: Rank,
        pool_id: PoolId,
    ) -> Result<bool> {
        *self.probes.entry(rank).or_insert(0) += 1;
        if !self.probe_latency.is_zero() {
            tokio::time::sleep(self.probe_latency).await;
        }

        let state = self.state.lock();
        if !state.live.contains(&rank) {
            return Err(ConnectionError::RankUnreachable { rank }.into());
        }
        let is_leader = state.pools.get(&pool_id).and_then(|p| p.leader) == Some(rank);
        debug!("sim: probe rank {} for pool {} -> {}", rank, pool_id, is_leader);
        Ok(is_leader)
    }
}

#[async_trait]
impl PoolProvisioner for SimCluster {
    async fn provision(
        &self,
        pool_id: PoolId,
        request: &CreatePoolRequest,
        targets: &[Rank],
    ) -> Result<()> {
        let mut state = self.state.lock();
        if targets.is_empty() || targets.iter().any(|r| !state.live.contains(r)) {
            return Err(PoolError::ProvisionFailed(format!("targets {targets:?} not all live")).into());
        }
        if let Some(capacity) = self.capacity {
            let free = capacity.saturating_sub(state.used_bytes());
            if request.size_bytes > free {
                return Err(PoolError::ProvisionFailed(format!(
                    "{} bytes requested, {} free",
                    request.size_bytes, free
                ))
                .into());
            }
        }
        state.pools.insert(
            pool_id,
            SimPool {
                size_bytes: request.size_bytes,
                replicas: Vec::new(),
                leader: None,
            },
        );
        Ok(())
    }

    async fn start_service(
        &self,
        pool_id: PoolId,
        replicas: &[Rank],
    ) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(rank) = replicas.iter().find(|r| !state.live.contains(r)) {
            return Err(ConnectionError::RankUnreachable { rank: *rank }.into());
        }
        let pool = state.pools.get_mut(&pool_id).ok_or(PoolError::PoolNotFound(pool_id))?;
        pool.replicas = replicas.to_vec();
        pool.leader = replicas.first().copied();
        info!("sim: pool {} service started on {:?}", pool_id, replicas);
        Ok(())
    }

    async fn release(
        &self,
        pool_id: PoolId,
    ) -> Result<()> {
        self.state.lock().pools.remove(&pool_id);
        Ok(())
    }
}
