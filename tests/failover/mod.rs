use std::time::Duration;

use poolsvc::ConnectionError;
use poolsvc::Error;
use poolsvc::SessionState;
use poolsvc::Settings;
use poolsvc::SimCluster;
use poolsvc::POOL_CONNECT_RO;
use poolsvc::POOL_CONNECT_RW;

use crate::common::TestContext;

/// # Case 1: Disconnect, kill the leader, reconnect
///
/// ## Validation criteria
/// 1. reconnect succeeds on a different rank
/// 2. the new leader is live and one of the original three
#[tokio::test]
async fn test_kill_leader_case1() {
    let ctx = TestContext::new(5);
    let (pool_id, members) = ctx.create_pool(3).await;

    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();
    let old_leader = session.leader().unwrap();
    ctx.service.disconnect_pool(&session);

    assert!(ctx.cluster.kill(old_leader));

    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();
    let new_leader = session.leader().unwrap();
    assert_ne!(new_leader, old_leader);
    assert!(members.contains(&new_leader));
    assert!(ctx.cluster.is_live(new_leader));
    // Unreachable is not excluded.
    assert!(ctx.service.get_members(pool_id).unwrap().contains(&old_leader));
}

/// # Case 2: Leader dies under a live session
///
/// ## Validation criteria
/// 1. session degrades on report, then fails over lazily on next use
/// 2. a second resolution does not probe the dead rank first
#[tokio::test]
async fn test_kill_leader_case2() {
    let ctx = TestContext::new(3);
    let (pool_id, _) = ctx.create_pool(3).await;
    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RO).await.unwrap();
    let old_leader = session.leader().unwrap();

    ctx.cluster.kill(old_leader);
    ctx.service.report_unreachable(&session);
    assert_eq!(session.state(), SessionState::Degraded);

    let new_leader = ctx.service.leader(&session).await.unwrap();
    assert_ne!(new_leader, old_leader);
    assert_eq!(session.state(), SessionState::Connected);

    ctx.cluster.reset_probe_counts();
    let other = ctx.service.connect_pool(pool_id, POOL_CONNECT_RO).await.unwrap();
    assert_eq!(other.leader(), Some(new_leader));
    assert_eq!(ctx.cluster.probe_count(old_leader), 0);
}

/// # Case 3: Every replica down
#[tokio::test]
async fn test_kill_leader_case3() {
    let ctx = TestContext::new(3);
    let (pool_id, members) = ctx.create_pool(3).await;
    let session = ctx.service.connect_pool(pool_id, POOL_CONNECT_RW).await.unwrap();

    for r in &members {
        ctx.cluster.kill(*r);
    }
    let e = ctx.service.query_pool(&session).await.unwrap_err();
    assert!(matches!(
        e,
        Error::Connection(ConnectionError::ConnectionFailed { .. })
    ));
    assert!(e.is_retryable());
    assert_eq!(session.state(), SessionState::Failed);

    let e = ctx
        .service
        .connect_pool(pool_id, POOL_CONNECT_RW)
        .await
        .unwrap_err();
    assert!(e.is_retryable());
}

/// Probes slower than the resolve deadline give up instead of hanging.
#[tokio::test(start_paused = true)]
async fn test_connect_times_out() {
    let mut settings = Settings::default();
    settings.connection.connect_timeout_ms = 100;
    let ctx = TestContext::with(
        SimCluster::new(3).with_probe_latency(Duration::from_millis(80)),
        settings,
    );
    let (pool_id, _) = ctx.create_pool(3).await;
    ctx.cluster.kill(poolsvc::Rank::new(0).unwrap());
    ctx.cluster.kill(poolsvc::Rank::new(1).unwrap());

    // Rank 2 now leads, but reaching it takes three 80ms probes.
    let e = ctx
        .service
        .connect_pool(pool_id, POOL_CONNECT_RW)
        .await
        .unwrap_err();
    assert!(matches!(
        e,
        Error::Connection(ConnectionError::ConnectionFailed { .. })
    ));
}
