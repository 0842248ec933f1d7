use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Minimum membership a directory must keep after an exclusion
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuorumPolicy {
    #[default]
    AtLeastOne,
    /// Strict majority of the target replica count
    Majority,
}

impl QuorumPolicy {
    /// Members required to survive for a directory of `target` replicas
    pub fn required(
        &self,
        target: usize,
    ) -> usize {
        match self {
            QuorumPolicy::AtLeastOne => 1,
            QuorumPolicy::Majority => target / 2 + 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub quorum: QuorumPolicy,
}

impl DirectoryConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
