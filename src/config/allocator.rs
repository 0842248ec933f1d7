use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// How replica ranks are picked from the live rank set
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Lowest ranks first
    #[default]
    Ascending,
    /// Shuffle with a fixed seed, reproducible across runs
    Seeded { seed: u64 },
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AllocatorConfig {
    #[serde(default)]
    pub selection: SelectionStrategy,

    /// Fail pool creation instead of accepting fewer replicas than requested
    #[serde(default)]
    pub require_exact_replicas: bool,
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
