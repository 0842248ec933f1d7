use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocatorConfig {
    /// Timeout for a single "are you the leader" probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Upper bound for one full resolution across all candidates
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,

    /// Ranks remembered as dead per pool
    #[serde(default = "default_negative_cache_capacity")]
    pub negative_cache_capacity: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            negative_cache_capacity: default_negative_cache_capacity(),
        }
    }
}

impl LocatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(Error::InvalidArgument("locator.probe_timeout_ms must be > 0".into()));
        }
        if self.resolve_timeout_ms < self.probe_timeout_ms {
            return Err(Error::InvalidArgument(format!(
                "locator.resolve_timeout_ms({}) must not be below probe_timeout_ms({})",
                self.resolve_timeout_ms, self.probe_timeout_ms
            )));
        }
        if self.negative_cache_capacity == 0 {
            return Err(Error::InvalidArgument(
                "locator.negative_cache_capacity must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

fn default_probe_timeout_ms() -> u64 {
    200
}
fn default_resolve_timeout_ms() -> u64 {
    2000
}
fn default_negative_cache_capacity() -> usize {
    16
}
