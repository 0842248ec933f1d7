use std::sync::Arc;

use poolsvc::gather_metrics;
use poolsvc::CreatePoolRequest;
use poolsvc::Error;
use poolsvc::PoolError;
use poolsvc::SessionState;
use poolsvc::Settings;
use poolsvc::SimCluster;
use poolsvc::SledDirectoryStore;
use poolsvc::POOL_CONNECT_RW;
use tempfile::tempdir;

use crate::common::assert_valid_members;
use crate::common::rank;
use crate::common::TestContext;
use crate::common::POOL_SIZE;

/// One server, one replica: the member list is exactly that server.
#[tokio::test]
async fn test_single_server_pool() {
    let ctx = TestContext::new(1);
    let (pool_id, members) = ctx.create_pool(1).await;

    assert_eq!(members, vec![rank(0)]);
    assert_eq!(ctx.service.get_members(pool_id).unwrap(), vec![rank(0)]);
}

#[tokio::test]
async fn test_replicas_drawn_from_larger_cluster() {
    for (servers, replicas) in [(3, 3), (5, 3), (8, 5)] {
        let ctx = TestContext::new(servers);
        let (pool_id, _) = ctx.create_pool(replicas).await;

        let members = ctx.service.get_members(pool_id).unwrap();
        assert_eq!(members.len(), replicas as usize);
        assert_valid_members(&members, &ctx.cluster);
    }
}

/// # Case 1: Too few live servers, default policy
///
/// ## Validation criteria
/// 1. membership never exceeds the live count and has no duplicates
/// 2. the shortfall is reported
#[tokio::test]
async fn test_replica_shortfall_case1() {
    let ctx = TestContext::new(2);
    let resp = ctx
        .service
        .create_pool(CreatePoolRequest::new(POOL_SIZE, 3))
        .await
        .unwrap();

    assert_eq!(resp.members.len(), 2);
    assert_eq!(resp.shortfall(), 1);
    assert_valid_members(&resp.members, &ctx.cluster);
}

/// # Case 2: Too few live servers, exact replicas required
#[tokio::test]
async fn test_replica_shortfall_case2() {
    let mut settings = Settings::default();
    settings.allocator.require_exact_replicas = true;
    let ctx = TestContext::with(SimCluster::new(2), settings);

    let e = ctx
        .service
        .create_pool(CreatePoolRequest::new(POOL_SIZE, 3))
        .await
        .unwrap_err();

    assert!(matches!(
        e,
        Error::Pool(PoolError::InsufficientServers {
            requested: 3,
            available: 2
        })
    ));
    assert!(ctx.service.pool_ids().is_empty());
}

/// Disconnecting twice is harmless and the pool stays connectable.
#[tokio::test]
async fn test_disconnect_twice() {
    let ctx = TestContext::new(3);
    let (pool_id, _) = ctx.create_pool(3).await;

    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();
    ctx.service.disconnect_pool(&session);
    ctx.service.disconnect_pool(&session);
    assert_eq!(session.state(), SessionState::Unconnected);

    let again = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();
    assert_eq!(again.state(), SessionState::Connected);
    ctx.service.disconnect_pool(&again);
    ctx.service.destroy_pool(pool_id, false).await.unwrap();
}

/// Directories committed to sled are picked up by a fresh service.
#[tokio::test]
async fn test_recover_from_sled() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SledDirectoryStore::open(dir.path()).unwrap());

    let ctx = TestContext::with_store(SimCluster::new(4), Settings::default(), store.clone());
    let (pool_id, members) = ctx.create_pool(3).await;
    ctx.service.exclude_ranks(pool_id, &[members[2]]).unwrap();

    let restarted = TestContext::with_store(SimCluster::new(4), Settings::default(), store);
    assert_eq!(restarted.service.recover().unwrap(), 1);
    assert_eq!(restarted.service.get_members(pool_id).unwrap(), members[..2].to_vec());
}

#[tokio::test]
async fn test_metrics_exposed() {
    let ctx = TestContext::new(3);
    let (pool_id, _) = ctx.create_pool(3).await;
    ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();

    let text = gather_metrics();
    assert!(text.contains("leader_probes"));
    assert!(text.contains("pool_creations"));
}
