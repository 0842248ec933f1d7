//! Pool Service Error Hierarchy
//!
//! Errors are grouped by the component that raises them. Directory and
//! connection failures keep their own enums so callers can branch on the
//! exact cause instead of a single catch-all.

use config::ConfigError;

use crate::PoolId;
use crate::Rank;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Replica directory membership and invariant failures
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Leader discovery and session failures
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Pool lifecycle failures
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Infrastructure-level failures (storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad caller input, never retried
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Requested rank is not a current service member
    #[error("Rank {rank} is not a service member of pool {pool_id}")]
    NotAMember { pool_id: PoolId, rank: Rank },

    /// Removal would leave fewer members than the quorum policy allows
    #[error("Quorum violation on pool {pool_id} (remaining: {remaining}, required: {required})")]
    QuorumViolation {
        pool_id: PoolId,
        remaining: usize,
        required: usize,
    },

    /// Duplicate rank, leaked sentinel or over-long member list
    #[error("Internal inconsistency in pool {pool_id} directory: {reason}")]
    InternalInconsistency { pool_id: PoolId, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Every candidate was probed and none answered as leader
    #[error("No leader available for pool {pool_id} after probing {probed} replicas")]
    NoLeaderAvailable { pool_id: PoolId, probed: usize },

    /// Session could not be established or re-established
    #[error("Connection to pool {pool_id} failed: {reason}")]
    ConnectionFailed { pool_id: PoolId, reason: String },

    /// Probe transport could not reach the rank
    #[error("Rank {rank} unreachable")]
    RankUnreachable { rank: Rank },

    /// Operation on a session that is not connected
    #[error("Session {session_id} is not connected")]
    NotConnected { session_id: String },

    /// Leader resolution abandoned by the caller
    #[error("Leader resolution for pool {pool_id} cancelled")]
    Cancelled { pool_id: PoolId },
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Pool could not be created on the available servers
    #[error("Insufficient servers (requested: {requested}, available: {available})")]
    InsufficientServers { requested: usize, available: usize },

    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    /// Non-forced destroy with sessions still connected
    #[error("Pool {pool_id} busy with {sessions} connected sessions")]
    PoolBusy { pool_id: PoolId, sessions: usize },

    #[error("Pool {0} already exists")]
    AlreadyExists(PoolId),

    /// Storage collaborator refused the pool
    #[error("Pool provisioning failed: {0}")]
    ProvisionFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl Error {
    /// Transient failures the caller may choose to re-invoke.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Connection(
                ConnectionError::NoLeaderAvailable { .. }
                    | ConnectionError::ConnectionFailed { .. }
                    | ConnectionError::RankUnreachable { .. }
            )
        )
    }

    pub fn is_invariant_breach(&self) -> bool {
        matches!(self, Error::Directory(DirectoryError::InternalInconsistency { .. }))
    }
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err).into()
    }
}
