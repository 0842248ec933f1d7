//! Chooses which ranks host a pool's service at creation time.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::AllocatorConfig;
use crate::DirectoryConfig;
use crate::DirectoryStore;
use crate::Error;
use crate::PoolError;
use crate::PoolId;
use crate::Rank;
use crate::RankList;
use crate::ReplicaDirectory;
use crate::Result;
use crate::SelectionStrategy;

pub struct ReplicaSetAllocator {
    config: AllocatorConfig,
    directory: DirectoryConfig,
    store: Arc<dyn DirectoryStore>,
}

impl ReplicaSetAllocator {
    pub fn new(
        config: AllocatorConfig,
        directory: DirectoryConfig,
        store: Arc<dyn DirectoryStore>,
    ) -> Self {
        Self {
            config,
            directory,
            store,
        }
    }

    /// Picks up to `requested` distinct ranks from `snapshot` and commits the
    /// resulting directory.
    ///
    /// A short snapshot yields a shorter directory unless
    /// `require_exact_replicas` is set. An empty snapshot always fails.
    pub fn allocate(
        &self,
        pool_id: PoolId,
        requested: u32,
        snapshot: &[Rank],
    ) -> Result<ReplicaDirectory> {
        if requested == 0 {
            return Err(Error::InvalidArgument("replica count must be >= 1".into()));
        }
        let requested = requested as usize;

        let candidates = self.select(snapshot);
        let available = candidates.len();
        if available == 0 || (self.config.require_exact_replicas && available < requested) {
            return Err(PoolError::InsufficientServers { requested, available }.into());
        }
        if available < requested {
            warn!(
                "pool {}: {} replicas requested, only {} ranks available",
                pool_id, requested, available
            );
        }

        let chosen: Vec<Rank> = candidates.into_iter().take(requested).collect();
        debug!("pool {}: replica ranks chosen {:?}", pool_id, chosen);

        let members = RankList::new(chosen).map_err(|v| Error::Fatal(format!("allocator produced {v}")))?;
        let directory = ReplicaDirectory::create(
            pool_id,
            requested,
            members,
            self.directory.quorum,
            self.store.clone(),
        )?;

        info!(
            "pool {}: service replicas allocated {:?}",
            pool_id,
            directory.members()?
        );
        Ok(directory)
    }

    /// Distinct, non-sentinel ranks in selection order
    pub(crate) fn select(
        &self,
        snapshot: &[Rank],
    ) -> Vec<Rank> {
        let unique: BTreeSet<Rank> = snapshot.iter().copied().filter(|r| !r.is_none()).collect();
        let mut ordered: Vec<Rank> = unique.into_iter().collect();

        match self.config.selection {
            SelectionStrategy::Ascending => {}
            SelectionStrategy::Seeded { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                ordered.shuffle(&mut rng);
            }
        }
        ordered
    }
}
