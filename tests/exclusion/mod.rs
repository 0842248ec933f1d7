use std::sync::Arc;

use poolsvc::DirectoryError;
use poolsvc::Error;
use poolsvc::SessionState;
use poolsvc::Settings;
use poolsvc::SimCluster;
use poolsvc::QuorumPolicy;
use poolsvc::POOL_CONNECT_RO;
use poolsvc::POOL_CONNECT_RW;

use crate::common::assert_valid_members;
use crate::common::TestContext;

/// # Exclude a dead follower
///
/// ## Validation criteria
/// 1. GetMembers no longer lists it
/// 2. later connects and queries never probe it
#[tokio::test]
async fn test_exclude_dead_follower() {
    let ctx = TestContext::new(4);
    let (pool_id, members) = ctx.create_pool(3).await;
    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();
    let leader = session.leader().unwrap();
    let victim = *members.iter().find(|r| **r != leader).unwrap();

    ctx.cluster.kill(victim);
    let ex = ctx.service.exclude_ranks(pool_id, &[victim]).unwrap();
    assert_eq!(ex.degraded_sessions, 0);

    let now = ctx.service.get_members(pool_id).unwrap();
    assert!(!now.contains(&victim));
    assert_eq!(now.len(), 2);
    assert_valid_members(&now, &ctx.cluster);

    ctx.cluster.reset_probe_counts();
    ctx.service.disconnect_pool(&session);
    for _ in 0..3 {
        let s = ctx.service.connect_pool(pool_id, POOL_CONNECT_RO).await.unwrap();
        ctx.service.query_pool(&s).await.unwrap();
        ctx.service.disconnect_pool(&s);
    }
    assert_eq!(ctx.cluster.probe_count(victim), 0);
}

/// # Exclude the leader of a live session
///
/// ## Validation criteria
/// 1. the session degrades immediately
/// 2. next query re-binds to a surviving member
#[tokio::test]
async fn test_exclude_bound_leader() {
    let ctx = TestContext::new(3);
    let (pool_id, _) = ctx.create_pool(3).await;
    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();
    let leader = session.leader().unwrap();

    ctx.cluster.kill(leader);
    let ex = ctx.service.exclude_ranks(pool_id, &[leader]).unwrap();
    assert_eq!(ex.degraded_sessions, 1);
    assert_eq!(session.state(), SessionState::Degraded);

    let info = ctx.service.query_pool(&session).await.unwrap();
    assert_ne!(info.leader, leader);
    assert!(!info.members.contains(&leader));
    assert_eq!(ctx.cluster.leader_of(pool_id), Some(info.leader));
}

#[tokio::test]
async fn test_exclusion_respects_majority_quorum() {
    let mut settings = Settings::default();
    settings.directory.quorum = QuorumPolicy::Majority;
    let ctx = TestContext::with(SimCluster::new(5), settings);
    let (pool_id, members) = ctx.create_pool(5).await;

    ctx.service.exclude_ranks(pool_id, &members[3..]).unwrap();
    let e = ctx
        .service
        .exclude_ranks(pool_id, &members[2..3])
        .unwrap_err();
    assert!(matches!(
        e,
        Error::Directory(DirectoryError::QuorumViolation {
            remaining: 2,
            required: 3,
            ..
        })
    ));
    assert_eq!(ctx.service.get_members(pool_id).unwrap(), members[..3].to_vec());
}

/// Connects racing an exclusion never end up bound to a removed rank
/// without being degraded.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_connect_races_exclusion() {
    let ctx = Arc::new(TestContext::new(5));
    let (pool_id, members) = ctx.create_pool(5).await;
    let excluded = members[0];
    ctx.cluster.kill(excluded);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            ctx.service.connect_pool(pool_id, POOL_CONNECT_RO).await
        }));
    }
    ctx.service.exclude_ranks(pool_id, &[excluded]).unwrap();

    for handle in handles {
        let session = handle.await.unwrap().unwrap();
        if session.leader() == Some(excluded) {
            assert_ne!(session.state(), SessionState::Connected);
        }
        assert_ne!(ctx.service.leader(&session).await.unwrap(), excluded);
    }
}
