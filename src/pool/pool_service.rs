use std::sync::Arc;

use autometrics::autometrics;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ConnectionManager;
use crate::CreatePoolRequest;
use crate::CreatePoolResponse;
use crate::DirectoryRegistry;
use crate::DirectoryStore;
use crate::Exclusion;
use crate::ExclusionCoordinator;
use crate::LeaderLocator;
use crate::PoolError;
use crate::PoolId;
use crate::PoolInfo;
use crate::PoolProvisioner;
use crate::Rank;
use crate::RankProvider;
use crate::ReplicaDirectory;
use crate::ReplicaSetAllocator;
use crate::Result;
use crate::Session;
use crate::SessionRegistry;
use crate::Settings;
use crate::API_SLO;
use crate::POOL_CREATIONS;

pub struct PoolService {
    pub(super) settings: Settings,
    pub(super) ranks: Arc<dyn RankProvider>,
    pub(super) provisioner: Arc<dyn PoolProvisioner>,
    pub(super) store: Arc<dyn DirectoryStore>,
    pub(super) allocator: ReplicaSetAllocator,
    pub(super) directories: Arc<DirectoryRegistry>,
    pub(super) sessions: Arc<SessionRegistry>,
    pub(super) locator: Arc<LeaderLocator>,
    pub(super) connections: ConnectionManager,
    pub(super) exclusion: ExclusionCoordinator,
}

impl PoolService {
    /// Creates a pool and its service replica directory.
    ///
    /// Storage is provisioned across every live rank; the service runs on
    /// up to `replica_count` of them. The response reports any shortfall.
    /// Nothing is left behind on failure.
    #[autometrics(objective = API_SLO)]
    pub async fn create_pool(
        &self,
        request: CreatePoolRequest,
    ) -> Result<CreatePoolResponse> {
        let result = self.try_create_pool(&request).await;
        let outcome = match &result {
            Ok(r) if r.shortfall() > 0 => "shortfall",
            Ok(_) => "ok",
            Err(_) => "failed",
        };
        POOL_CREATIONS.with_label_values(&[outcome]).inc();
        result
    }

    async fn try_create_pool(
        &self,
        request: &CreatePoolRequest,
    ) -> Result<CreatePoolResponse> {
        request.validate()?;
        let live = self.ranks.live_ranks()?;
        let pool_id = PoolId::generate();

        if let Err(e) = self.provisioner.provision(pool_id, request, &live).await {
            warn!("pool {}: storage provisioning failed: {}", pool_id, e);
            return Err(PoolError::InsufficientServers {
                requested: request.replica_count as usize,
                available: live.len(),
            }
            .into());
        }

        let directory = match self.allocator.allocate(pool_id, request.replica_count, &live) {
            Ok(d) => d,
            Err(e) => {
                self.release_quietly(pool_id).await;
                return Err(e);
            }
        };
        let members = directory.members()?;

        if let Err(e) = self.provisioner.start_service(pool_id, &members).await {
            error!("pool {}: service start on {:?} failed: {}", pool_id, members, e);
            if let Err(e) = directory.purge() {
                error!("pool {}: directory record left behind: {}", pool_id, e);
            }
            self.release_quietly(pool_id).await;
            return Err(PoolError::ProvisionFailed(e.to_string()).into());
        }

        self.directories.insert(Arc::new(directory))?;
        info!("pool {} created with service members {:?}", pool_id, members);
        Ok(CreatePoolResponse {
            pool_id,
            members,
            requested: request.replica_count as usize,
        })
    }

    pub async fn connect_pool(
        &self,
        pool_id: PoolId,
        flags: u64,
    ) -> Result<Session> {
        self.connections.connect(pool_id, flags).await
    }

    /// Idempotent
    pub fn disconnect_pool(
        &self,
        session: &Session,
    ) {
        self.connections.disconnect(session)
    }

    /// Destroys the pool. Without `force`, open sessions make this fail
    /// with `PoolBusy`; with it they are all forced to `Unconnected`.
    ///
    /// A failed record purge is returned only after the pool's storage has
    /// been released.
    #[autometrics(objective = API_SLO)]
    pub async fn destroy_pool(
        &self,
        pool_id: PoolId,
        force: bool,
    ) -> Result<()> {
        let directory = self.directories.get(pool_id)?;
        let open = self.sessions.open_count(pool_id);
        if open > 0 && !force {
            return Err(PoolError::PoolBusy {
                pool_id,
                sessions: open,
            }
            .into());
        }

        self.directories.remove(pool_id);
        let closed = self.sessions.close_pool(pool_id);
        // Storage is released even when the record outlives the pool.
        let purged = directory.purge();
        if let Err(e) = &purged {
            error!("pool {}: failed to purge directory record: {:?}", pool_id, e);
        }
        self.locator.invalidate(pool_id);
        self.provisioner.release(pool_id).await?;
        purged?;

        info!("pool {} destroyed ({} sessions closed)", pool_id, closed);
        Ok(())
    }

    pub fn exclude_ranks(
        &self,
        pool_id: PoolId,
        ranks: &[Rank],
    ) -> Result<Exclusion> {
        self.exclusion.exclude(pool_id, ranks)
    }

    /// Current service members, in directory order
    pub fn get_members(
        &self,
        pool_id: PoolId,
    ) -> Result<Vec<Rank>> {
        self.directories.get(pool_id)?.members()
    }

    pub async fn query_pool(
        &self,
        session: &Session,
    ) -> Result<PoolInfo> {
        self.connections.query(session).await
    }

    /// Leader of the session's pool, failing over if the bound one is stale.
    pub async fn leader(
        &self,
        session: &Session,
    ) -> Result<Rank> {
        self.connections.leader(session).await
    }

    pub fn report_unreachable(
        &self,
        session: &Session,
    ) {
        self.connections.report_unreachable(session)
    }

    /// Resolves the pool leader outside any session. Abandoned as soon as
    /// `token` is cancelled.
    pub async fn resolve_leader(
        &self,
        pool_id: PoolId,
        token: &CancellationToken,
    ) -> Result<Rank> {
        let directory = self.directories.get(pool_id)?;
        self.locator
            .resolve_leader_cancellable(&directory, self.settings.locator.resolve_timeout(), token)
            .await
    }

    /// Re-registers every persisted directory not already known.
    ///
    /// Records failing their invariants are logged and skipped. Returns the
    /// number of directories recovered.
    pub fn recover(&self) -> Result<usize> {
        let mut recovered = 0;
        for record in self.store.load_all()? {
            if self.directories.contains(record.pool_id) {
                continue;
            }
            let directory =
                match ReplicaDirectory::from_record(&record, self.settings.directory.quorum, self.store.clone()) {
                    Ok(d) => d,
                    Err(e) => {
                        error!("pool {}: persisted directory rejected: {}", record.pool_id, e);
                        continue;
                    }
                };
            self.directories.insert(Arc::new(directory))?;
            recovered += 1;
        }
        info!("recovered {} pool directories", recovered);
        Ok(recovered)
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.directories.pool_ids()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn release_quietly(
        &self,
        pool_id: PoolId,
    ) {
        if let Err(e) = self.provisioner.release(pool_id).await {
            error!("pool {}: storage release failed: {}", pool_id, e);
        }
    }
}
