use std::fmt;

use crate::Error;
use crate::Result;
use crate::POOL_CONNECT_EX;
use crate::POOL_CONNECT_RO;
use crate::POOL_CONNECT_RW;

/// Pool connect mode. Exactly one mode bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessFlags(u64);

impl AccessFlags {
    pub const READ_ONLY: AccessFlags = AccessFlags(POOL_CONNECT_RO);
    pub const READ_WRITE: AccessFlags = AccessFlags(POOL_CONNECT_RW);
    pub const EXCLUSIVE: AccessFlags = AccessFlags(POOL_CONNECT_EX);

    const KNOWN: u64 = POOL_CONNECT_RO | POOL_CONNECT_RW | POOL_CONNECT_EX;

    /// Validates raw caller flags.
    pub fn from_bits(bits: u64) -> Result<Self> {
        if bits & !Self::KNOWN != 0 {
            return Err(Error::InvalidArgument(format!(
                "unknown access flag bits {:#x}",
                bits & !Self::KNOWN
            )));
        }
        if bits.count_ones() != 1 {
            return Err(Error::InvalidArgument(format!(
                "exactly one access mode expected, got {bits:#x}"
            )));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_exclusive(self) -> bool {
        self == Self::EXCLUSIVE
    }

    pub fn is_read_only(self) -> bool {
        self == Self::READ_ONLY
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match *self {
            Self::READ_ONLY => write!(f, "RO"),
            Self::READ_WRITE => write!(f, "RW"),
            _ => write!(f, "EX"),
        }
    }
}
