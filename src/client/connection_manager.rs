//! Pool connect/disconnect and lazy leader failover for sessions.
//!
//! A session never chases membership changes eagerly. Exclusion or a failed
//! leader confirmation only degrades it; the next operation that needs the
//! leader re-runs discovery through the [`LeaderLocator`].

use std::sync::Arc;
use std::time::Duration;

use autometrics::autometrics;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::AccessFlags;
use crate::ConnectionConfig;
use crate::ConnectionError;
use crate::DirectoryRegistry;
use crate::Error;
use crate::LeaderLocator;
use crate::PoolError;
use crate::PoolId;
use crate::Rank;
use crate::ReplicaDirectory;
use crate::Result;
use crate::Session;
use crate::SessionRegistry;
use crate::SessionState;
use crate::API_SLO;

/// Pool state as seen through a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub pool_id: PoolId,
    pub leader: Rank,
    pub members: Vec<Rank>,
    pub target: usize,
    pub version: u64,
}

pub struct ConnectionManager {
    directories: Arc<DirectoryRegistry>,
    sessions: Arc<SessionRegistry>,
    locator: Arc<LeaderLocator>,
    config: ConnectionConfig,
}

impl ConnectionManager {
    pub fn new(
        directories: Arc<DirectoryRegistry>,
        sessions: Arc<SessionRegistry>,
        locator: Arc<LeaderLocator>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            directories,
            sessions,
            locator,
            config,
        }
    }

    /// Connects within the configured connect timeout.
    pub async fn connect(
        &self,
        pool_id: PoolId,
        flags: u64,
    ) -> Result<Session> {
        self.connect_within(pool_id, flags, self.config.connect_timeout())
            .await
    }

    /// Resolves the pool leader and binds a new session to it.
    ///
    /// The access mode is claimed before discovery starts, so two
    /// concurrent exclusive connects cannot both be admitted.
    ///
    /// Errors:
    /// - `InvalidArgument` for malformed flags
    /// - `PoolNotFound` for an unknown pool, or one destroyed mid-connect
    /// - `PoolBusy` when the requested mode conflicts with another holder
    /// - `ConnectionFailed` when no replica answers as leader in time
    #[autometrics(objective = API_SLO)]
    pub async fn connect_within(
        &self,
        pool_id: PoolId,
        flags: u64,
        deadline: Duration,
    ) -> Result<Session> {
        let flags = AccessFlags::from_bits(flags)?;
        let directory = self.directories.get(pool_id)?;
        let reservation = self.sessions.reserve(pool_id, flags)?;

        let leader = self
            .locator
            .resolve_leader_within(&directory, deadline)
            .await
            .map_err(|e| connection_failed(pool_id, e))?;

        let session = Session::connected(pool_id, flags, leader);
        reservation.commit(session.clone());

        // A forced destroy may have run while we were resolving.
        if !self.directories.contains(pool_id) {
            session.close();
            self.sessions.remove(session.id());
            warn!(
                "pool {} destroyed while session {} was connecting",
                pool_id,
                session.id()
            );
            return Err(PoolError::PoolNotFound(pool_id).into());
        }

        // Exclusion may have removed the leader while we were resolving.
        if !directory.contains(leader) {
            debug!(
                "leader {} of pool {} excluded during connect",
                leader, pool_id
            );
            session.degrade();
        }

        info!(
            "session {} connected to pool {} (leader {}, mode {})",
            session.id(),
            pool_id,
            leader,
            flags
        );
        Ok(session)
    }

    /// Idempotent: disconnecting an unconnected session is a no-op.
    pub fn disconnect(
        &self,
        session: &Session,
    ) {
        if session.close() {
            self.sessions.remove(session.id());
            info!(
                "session {} disconnected from pool {}",
                session.id(),
                session.pool_id()
            );
        } else {
            debug!("session {} already disconnected", session.id());
        }
    }

    /// Leader the session should talk to, re-running discovery when the
    /// bound leader is no longer trusted.
    pub async fn leader(
        &self,
        session: &Session,
    ) -> Result<Rank> {
        let directory = self.directory_for(session)?;
        if session.state() == SessionState::Connected {
            if let Some(leader) = session.leader() {
                if directory.contains(leader) {
                    return Ok(leader);
                }
            }
            session.degrade();
        }
        self.reresolve(session, &directory).await
    }

    /// Caller observed the bound leader failing to answer.
    pub fn report_unreachable(
        &self,
        session: &Session,
    ) {
        if session.degrade() {
            warn!(
                "session {}: leader {:?} of pool {} reported unreachable",
                session.id(),
                session.leader(),
                session.pool_id()
            );
        }
    }

    /// Confirms the bound leader and reports the pool's membership.
    /// A leader that fails confirmation triggers one re-resolution.
    #[autometrics(objective = API_SLO)]
    pub async fn query(
        &self,
        session: &Session,
    ) -> Result<PoolInfo> {
        let directory = self.directory_for(session)?;
        let leader = self.leader(session).await?;
        if self.locator.confirm_leader(&directory, leader).await {
            return pool_info(&directory, leader);
        }

        warn!(
            "session {}: leader {} of pool {} failed confirmation",
            session.id(),
            leader,
            session.pool_id()
        );
        session.degrade();
        let leader = self.leader(session).await?;
        pool_info(&directory, leader)
    }

    fn directory_for(
        &self,
        session: &Session,
    ) -> Result<Arc<ReplicaDirectory>> {
        if !session.is_open() {
            return Err(not_connected(session));
        }
        self.directories.get(session.pool_id())
    }

    async fn reresolve(
        &self,
        session: &Session,
        directory: &ReplicaDirectory,
    ) -> Result<Rank> {
        let pool_id = session.pool_id();
        match self
            .locator
            .resolve_leader_within(directory, self.config.connect_timeout())
            .await
        {
            Ok(leader) => {
                if !session.rebind(leader) {
                    return Err(not_connected(session));
                }
                info!(
                    "session {} re-bound to leader {} of pool {}",
                    session.id(),
                    leader,
                    pool_id
                );
                Ok(leader)
            }
            Err(e) => {
                session.fail();
                Err(connection_failed(pool_id, e))
            }
        }
    }
}

fn pool_info(
    directory: &ReplicaDirectory,
    leader: Rank,
) -> Result<PoolInfo> {
    let snapshot = directory.snapshot()?;
    Ok(PoolInfo {
        pool_id: snapshot.pool_id,
        leader,
        members: snapshot.members,
        target: snapshot.target,
        version: snapshot.version,
    })
}

fn not_connected(session: &Session) -> Error {
    ConnectionError::NotConnected {
        session_id: session.id().to_string(),
    }
    .into()
}

/// Discovery failures surface as `ConnectionFailed`; invariant breaches and
/// storage errors pass through untouched.
fn connection_failed(
    pool_id: PoolId,
    e: Error,
) -> Error {
    match e {
        Error::Connection(inner) => ConnectionError::ConnectionFailed {
            pool_id,
            reason: inner.to_string(),
        }
        .into(),
        other => other,
    }
}
