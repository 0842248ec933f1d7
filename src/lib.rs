//! Pool service replica directory.
//!
//! Decides which server ranks host a storage pool's replicated metadata
//! service, keeps the authoritative duplicate-free member list for each pool,
//! lets clients find and connect to the acting leader, and keeps that view
//! correct across leader failure and explicit rank exclusion.
//!
//! Entry point is [`PoolService`], assembled with [`PoolServiceBuilder`].
//! The cluster itself is reached through three narrow seams:
//! [`RankProvider`], [`LeaderProbe`] and [`PoolProvisioner`]. [`SimCluster`]
//! implements all three in process.

mod allocator;
mod client;
mod config;
mod constants;
mod directory;
mod errors;
mod exclusion;
mod locator;
mod metrics;
mod network;
mod pool;
mod rank;
mod sim;
mod storage;
mod types;

pub use allocator::*;
pub use client::*;
pub use config::*;
pub use constants::*;
pub use directory::*;
pub use errors::*;
pub use exclusion::*;
pub use locator::*;
pub use metrics::*;
pub use network::*;
pub use pool::*;
pub use rank::*;
pub use sim::*;
pub use storage::*;
pub use types::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
