//! Removes failed ranks from a pool's service membership.
//!
//! The directory removal is all-or-nothing. Once it commits, sessions bound
//! to a removed rank are degraded and the pool's negative cache is dropped,
//! since the version bump already invalidated it.

use std::sync::Arc;

use autometrics::autometrics;
use tracing::info;
use tracing::instrument;

use crate::DirectoryRegistry;
use crate::Error;
use crate::LeaderLocator;
use crate::PoolId;
use crate::Rank;
use crate::Result;
use crate::SessionRegistry;
use crate::API_SLO;
use crate::EXCLUDED_RANKS;

/// Outcome of a committed exclusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub removed: Vec<Rank>,
    /// Directory version after removal
    pub version: u64,
    pub degraded_sessions: usize,
}

pub struct ExclusionCoordinator {
    directories: Arc<DirectoryRegistry>,
    sessions: Arc<SessionRegistry>,
    locator: Arc<LeaderLocator>,
}

impl ExclusionCoordinator {
    pub fn new(
        directories: Arc<DirectoryRegistry>,
        sessions: Arc<SessionRegistry>,
        locator: Arc<LeaderLocator>,
    ) -> Self {
        Self {
            directories,
            sessions,
            locator,
        }
    }

    /// Removes `ranks` from the service membership of `pool_id`.
    ///
    /// Errors leave the directory and every session untouched:
    /// - `InvalidArgument` for an empty list or the sentinel rank
    /// - `PoolNotFound`
    /// - `NotAMember` / `QuorumViolation` from the directory
    #[autometrics(objective = API_SLO)]
    #[instrument(skip(self))]
    pub fn exclude(
        &self,
        pool_id: PoolId,
        ranks: &[Rank],
    ) -> Result<Exclusion> {
        if ranks.is_empty() {
            return Err(Error::InvalidArgument("no ranks to exclude".to_string()));
        }
        if ranks.iter().any(|r| r.is_none()) {
            return Err(Error::InvalidArgument(
                "sentinel rank can not be excluded".to_string(),
            ));
        }

        let directory = self.directories.get(pool_id)?;
        let version = directory.remove_members(ranks)?;

        let mut removed = ranks.to_vec();
        removed.sort();
        removed.dedup();

        let degraded_sessions = self.sessions.degrade_bound_to(pool_id, &removed);
        self.locator.invalidate(pool_id);
        EXCLUDED_RANKS.inc_by(removed.len() as u64);

        info!(
            "pool {}: excluded {:?} at version {}, {} sessions degraded",
            pool_id, removed, version, degraded_sessions
        );
        Ok(Exclusion {
            removed,
            version,
            degraded_sessions,
        })
    }
}
