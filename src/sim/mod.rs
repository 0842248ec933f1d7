//! In-process cluster for exercising the pool service without servers.
//!
//! [`SimCluster`] plays all three external collaborators at once: it lists
//! live ranks, answers leader probes and provisions pools. Each pool it
//! provisions gets a replica set and a leader; killing the leader re-elects
//! the first surviving replica. Probes are counted per rank.

mod sim_cluster;
pub use sim_cluster::*;
