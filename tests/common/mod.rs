use std::collections::HashSet;
use std::sync::Arc;

use poolsvc::CreatePoolRequest;
use poolsvc::DirectoryStore;
use poolsvc::MemDirectoryStore;
use poolsvc::PoolId;
use poolsvc::PoolService;
use poolsvc::PoolServiceBuilder;
use poolsvc::Rank;
use poolsvc::Settings;
use poolsvc::SimCluster;
use poolsvc::RANK_NONE;

pub const POOL_SIZE: u64 = 1 << 30;

pub fn rank(raw: u32) -> Rank {
    Rank::new(raw).unwrap()
}

pub struct TestContext {
    pub cluster: Arc<SimCluster>,
    pub service: PoolService,
}

impl TestContext {
    pub fn new(servers: u32) -> Self {
        Self::with(SimCluster::new(servers), Settings::default())
    }

    pub fn with(
        cluster: SimCluster,
        settings: Settings,
    ) -> Self {
        Self::with_store(cluster, settings, Arc::new(MemDirectoryStore::default()))
    }

    pub fn with_store(
        cluster: SimCluster,
        settings: Settings,
        store: Arc<dyn DirectoryStore>,
    ) -> Self {
        crate::enable_logger();
        let cluster = Arc::new(cluster);
        let service = PoolServiceBuilder::from_settings(settings)
            .rank_provider(cluster.clone())
            .probe(cluster.clone())
            .provisioner(cluster.clone())
            .store(store)
            .build()
            .unwrap();
        Self { cluster, service }
    }

    pub async fn create_pool(
        &self,
        replicas: u32,
    ) -> (PoolId, Vec<Rank>) {
        let resp = self
            .service
            .create_pool(CreatePoolRequest::new(POOL_SIZE, replicas))
            .await
            .unwrap();
        (resp.pool_id, resp.members)
    }
}

/// Member list as a client would check it: distinct, no sentinel, all live
pub fn assert_valid_members(
    members: &[Rank],
    cluster: &SimCluster,
) {
    let unique: HashSet<&Rank> = members.iter().collect();
    assert_eq!(unique.len(), members.len(), "duplicate rank in {members:?}");
    for r in members {
        assert_ne!(r.get(), RANK_NONE, "sentinel in {members:?}");
        assert!(cluster.is_live(*r), "rank {r} not live");
    }
}
