use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::CreatePoolRequest;
use crate::PoolId;
use crate::Rank;
use crate::Result;

/// Storage side of pool lifecycle. Only the replica directory is owned here;
/// target storage and the service processes belong to the provisioner.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PoolProvisioner: Send + Sync + 'static {
    /// Reserves `request.size_bytes` across `targets`.
    async fn provision(
        &self,
        pool_id: PoolId,
        request: &CreatePoolRequest,
        targets: &[Rank],
    ) -> Result<()>;

    /// Starts the pool service on the chosen replicas.
    async fn start_service(
        &self,
        pool_id: PoolId,
        replicas: &[Rank],
    ) -> Result<()>;

    /// Stops the service and frees storage. Releasing an unknown pool is not
    /// an error.
    async fn release(
        &self,
        pool_id: PoolId,
    ) -> Result<()>;
}
