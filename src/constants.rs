// -
// Rank sentinel

/// Reserved rank value meaning "no rank" / unused slot.
///
/// Matches the all-ones value used by the cluster rank lists; no server is
/// ever assigned this rank.
pub const RANK_NONE: u32 = u32::MAX;

// -
// Database namespaces

/// Sled tree holding one directory record per pool
pub(crate) const DIRECTORY_TREE: &str = "_pool_svc_directory";

// -
// Pool connect modes

pub const POOL_CONNECT_RO: u64 = 1 << 0;
pub const POOL_CONNECT_RW: u64 = 1 << 1;
pub const POOL_CONNECT_EX: u64 = 1 << 2;

/// Length of generated session identifiers
pub(crate) const SESSION_ID_LEN: usize = 12;
