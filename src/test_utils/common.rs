use std::sync::Arc;

use crate::MemDirectoryStore;
use crate::PoolId;
use crate::QuorumPolicy;
use crate::Rank;
use crate::RankList;
use crate::ReplicaDirectory;

pub fn rank(raw: u32) -> Rank {
    Rank::new(raw).unwrap()
}

pub fn ranks(raw: &[u32]) -> Vec<Rank> {
    raw.iter().map(|x| rank(*x)).collect()
}

/// Full-strength in-memory directory over `raw` with a fresh pool id.
pub fn mem_directory(raw: &[u32]) -> ReplicaDirectory {
    ReplicaDirectory::create(
        PoolId::generate(),
        raw.len(),
        RankList::new(ranks(raw)).unwrap(),
        QuorumPolicy::AtLeastOne,
        Arc::new(MemDirectoryStore::default()),
    )
    .unwrap()
}

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}
