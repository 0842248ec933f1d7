use std::sync::Arc;

use super::*;
use crate::DirectoryError;
use crate::DirectoryStore;
use crate::Error;
use crate::MemDirectoryStore;
use crate::MockDirectoryStore;
use crate::PoolError;
use crate::PoolId;
use crate::QuorumPolicy;
use crate::Rank;
use crate::RankList;
use crate::StorageError;
use crate::RANK_NONE;

fn r(raw: u32) -> Rank {
    Rank::new(raw).unwrap()
}

fn list(raw: &[u32]) -> RankList {
    RankList::new(raw.iter().map(|x| r(*x)).collect()).unwrap()
}

fn directory_with(
    raw: &[u32],
    target: usize,
    quorum: QuorumPolicy,
) -> (ReplicaDirectory, Arc<MemDirectoryStore>) {
    let store = Arc::new(MemDirectoryStore::default());
    let dir = ReplicaDirectory::create(PoolId::generate(), target, list(raw), quorum, store.clone()).unwrap();
    (dir, store)
}

#[test]
fn create_persists_version_one() {
    let (dir, store) = directory_with(&[0, 1, 2], 3, QuorumPolicy::AtLeastOne);

    assert_eq!(dir.version(), 1);
    assert_eq!(dir.size(), 3);
    assert_eq!(dir.members().unwrap(), vec![r(0), r(1), r(2)]);

    let record = store.load(dir.pool_id()).unwrap().expect("record should be committed");
    assert_eq!(record.version, 1);
    assert_eq!(record.members().unwrap(), list(&[0, 1, 2]));
}

#[test]
fn create_rejects_more_members_than_target() {
    let store = Arc::new(MemDirectoryStore::default());
    let e = ReplicaDirectory::create(PoolId::generate(), 2, list(&[0, 1, 2]), QuorumPolicy::AtLeastOne, store)
        .unwrap_err();
    assert!(e.is_invariant_breach());
}

#[test]
fn create_fails_when_store_fails() {
    let mut store = MockDirectoryStore::new();
    store
        .expect_save()
        .times(1)
        .returning(|_| Err(StorageError::DbError("disk gone".into()).into()));

    let result = ReplicaDirectory::create(
        PoolId::generate(),
        1,
        list(&[0]),
        QuorumPolicy::AtLeastOne,
        Arc::new(store),
    );
    assert!(matches!(result, Err(Error::System(_))));
}

#[test]
fn remove_members_compacts_and_bumps_version() {
    let (dir, store) = directory_with(&[0, 1, 2], 3, QuorumPolicy::AtLeastOne);

    let version = dir.remove_members(&[r(1)]).unwrap();

    assert_eq!(version, 2);
    assert_eq!(dir.members().unwrap(), vec![r(0), r(2)]);
    let record = store.load(dir.pool_id()).unwrap().unwrap();
    assert_eq!(record.version, 2);
    assert_eq!(record.members().unwrap(), list(&[0, 2]));
}

#[test]
fn remove_members_is_all_or_nothing_on_unknown_rank() {
    let (dir, _) = directory_with(&[0, 1, 2], 3, QuorumPolicy::AtLeastOne);

    let e = dir.remove_members(&[r(1), r(9)]).unwrap_err();

    assert!(matches!(
        e,
        Error::Directory(DirectoryError::NotAMember { rank, .. }) if rank == r(9)
    ));
    assert_eq!(dir.members().unwrap(), vec![r(0), r(1), r(2)]);
    assert_eq!(dir.version(), 1);
}

#[test]
fn remove_members_keeps_at_least_one_member() {
    let (dir, _) = directory_with(&[0, 1], 2, QuorumPolicy::AtLeastOne);

    let e = dir.remove_members(&[r(0), r(1)]).unwrap_err();
    assert!(matches!(
        e,
        Error::Directory(DirectoryError::QuorumViolation {
            remaining: 0,
            required: 1,
            ..
        })
    ));
    assert_eq!(dir.size(), 2);

    assert!(dir.remove_members(&[r(0)]).is_ok());
    assert_eq!(dir.members().unwrap(), vec![r(1)]);
}

#[test]
fn majority_policy_is_measured_against_target() {
    let (dir, _) = directory_with(&[0, 1, 2, 3, 4], 5, QuorumPolicy::Majority);

    assert!(dir.remove_members(&[r(4), r(3)]).is_ok());
    let e = dir.remove_members(&[r(2)]).unwrap_err();
    assert!(matches!(
        e,
        Error::Directory(DirectoryError::QuorumViolation {
            remaining: 2,
            required: 3,
            ..
        })
    ));
}

#[test]
fn duplicate_ranks_in_request_count_once() {
    let (dir, _) = directory_with(&[0, 1, 2], 3, QuorumPolicy::AtLeastOne);
    assert_eq!(dir.remove_members(&[r(2), r(2)]).unwrap(), 2);
    assert_eq!(dir.members().unwrap(), vec![r(0), r(1)]);
}

#[test]
fn empty_removal_is_invalid() {
    let (dir, _) = directory_with(&[0], 1, QuorumPolicy::AtLeastOne);
    assert!(matches!(dir.remove_members(&[]), Err(Error::InvalidArgument(_))));
}

#[test]
fn removal_rolls_back_when_persist_fails() {
    let mut store = MockDirectoryStore::new();
    let mut calls = 0;
    store.expect_save().times(2).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Ok(())
        } else {
            Err(StorageError::DbError("flush failed".into()).into())
        }
    });
    let dir = ReplicaDirectory::create(
        PoolId::generate(),
        3,
        list(&[0, 1, 2]),
        QuorumPolicy::AtLeastOne,
        Arc::new(store),
    )
    .unwrap();

    assert!(dir.remove_members(&[r(0)]).is_err());
    assert_eq!(dir.members().unwrap(), vec![r(0), r(1), r(2)]);
    assert_eq!(dir.version(), 1);
}

#[test]
fn mark_leader_requires_membership() {
    let (dir, _) = directory_with(&[3, 5], 2, QuorumPolicy::AtLeastOne);

    let e = dir.mark_leader(r(4)).unwrap_err();
    assert!(matches!(e, Error::Directory(DirectoryError::NotAMember { .. })));

    let mark = dir.mark_leader(r(5)).unwrap();
    assert_eq!(mark, LeaderMark { previous_version: 1, version: 2 });
    assert!(mark.changed());
    assert_eq!(dir.leader(), Some(r(5)));
}

#[test]
fn re_marking_same_leader_keeps_version() {
    let (dir, _) = directory_with(&[3, 5], 2, QuorumPolicy::AtLeastOne);
    dir.mark_leader(r(3)).unwrap();

    let mark = dir.mark_leader(r(3)).unwrap();
    assert!(!mark.changed());
    assert_eq!(dir.version(), 2);
}

#[test]
fn removing_leader_clears_leader_annotation() {
    let (dir, _) = directory_with(&[0, 1, 2], 3, QuorumPolicy::AtLeastOne);
    dir.mark_leader(r(1)).unwrap();

    dir.remove_members(&[r(1)]).unwrap();
    assert_eq!(dir.leader(), None);
    assert_eq!(dir.snapshot().unwrap().version, 3);
}

#[test]
fn from_record_restores_state() {
    let (dir, store) = directory_with(&[4, 2, 7], 3, QuorumPolicy::AtLeastOne);
    dir.mark_leader(r(2)).unwrap();
    dir.remove_members(&[r(7)]).unwrap();

    let record = store.load(dir.pool_id()).unwrap().unwrap();
    let restored = ReplicaDirectory::from_record(&record, QuorumPolicy::AtLeastOne, store.clone()).unwrap();

    assert_eq!(restored.snapshot().unwrap(), dir.snapshot().unwrap());
}

#[test]
fn from_record_refuses_corrupted_record() {
    let (dir, store) = directory_with(&[0, 1], 2, QuorumPolicy::AtLeastOne);
    let mut record = store.load(dir.pool_id()).unwrap().unwrap();
    record.slots = vec![1, 1];

    let e = ReplicaDirectory::from_record(&record, QuorumPolicy::AtLeastOne, store.clone()).unwrap_err();
    assert!(e.is_invariant_breach());
}

#[test]
fn concurrent_mutations_are_serialized() {
    let (dir, _) = directory_with(&[0, 1, 2, 3, 4, 5, 6, 7], 8, QuorumPolicy::AtLeastOne);
    let dir = Arc::new(dir);

    let handles: Vec<_> = (0..7u32)
        .map(|i| {
            let dir = dir.clone();
            std::thread::spawn(move || {
                let _ = dir.mark_leader(r(7));
                dir.remove_members(&[r(i)]).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(dir.members().unwrap(), vec![r(7)]);
    // 7 removals + exactly one effective leader mark
    assert_eq!(dir.version(), 1 + 7 + 1);
}

#[test]
fn registry_rejects_duplicates_and_reports_missing() {
    let registry = DirectoryRegistry::default();
    let (dir, _) = directory_with(&[0], 1, QuorumPolicy::AtLeastOne);
    let pool_id = dir.pool_id();
    let dir = Arc::new(dir);

    registry.insert(dir.clone()).unwrap();
    assert!(matches!(
        registry.insert(dir),
        Err(Error::Pool(PoolError::AlreadyExists(id))) if id == pool_id
    ));
    assert!(registry.get(pool_id).is_ok());

    registry.remove(pool_id);
    assert!(matches!(registry.get(pool_id), Err(Error::Pool(PoolError::PoolNotFound(_)))));
    assert!(registry.is_empty());
}

#[test]
fn short_directory_persists_only_placed_slots() {
    let (dir, store) = directory_with(&[0, 1], 1_000_000, QuorumPolicy::AtLeastOne);
    let record = store.load(dir.pool_id()).unwrap().unwrap();
    assert_eq!(record.slots, vec![0, 1]);

    dir.remove_members(&[r(1)]).unwrap();
    let record = store.load(dir.pool_id()).unwrap().unwrap();
    assert_eq!(record.slots, vec![0, RANK_NONE]);

    let restored = ReplicaDirectory::from_record(&record, QuorumPolicy::AtLeastOne, store.clone()).unwrap();
    assert_eq!(restored.target(), 1_000_000);
    assert_eq!(restored.members().unwrap(), vec![r(0)]);
}
