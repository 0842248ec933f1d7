//! Assembles a [`PoolService`] from settings and its external collaborators.
//!
//! The rank provider, leader probe and provisioner have no defaults and must
//! be supplied. The directory store defaults to whatever the storage
//! settings select.
//!
//! ## Example
//! ```ignore
//! let service = PoolServiceBuilder::new(Some("config/poolsvc.toml"))?
//!     .rank_provider(cluster.clone())
//!     .probe(cluster.clone())
//!     .provisioner(cluster)
//!     .build()?;
//! service.recover()?;
//! ```

use std::sync::Arc;

use tracing::info;

use super::PoolService;
use crate::open_store;
use crate::ConnectionManager;
use crate::DirectoryRegistry;
use crate::DirectoryStore;
use crate::Error;
use crate::ExclusionCoordinator;
use crate::LeaderLocator;
use crate::LeaderProbe;
use crate::PoolProvisioner;
use crate::RankProvider;
use crate::ReplicaSetAllocator;
use crate::Result;
use crate::SessionRegistry;
use crate::Settings;

pub struct PoolServiceBuilder {
    settings: Settings,
    ranks: Option<Arc<dyn RankProvider>>,
    probe: Option<Arc<dyn LeaderProbe>>,
    provisioner: Option<Arc<dyn PoolProvisioner>>,
    store: Option<Arc<dyn DirectoryStore>>,
}

impl PoolServiceBuilder {
    /// Loads settings from defaults, `CONFIG_PATH` and the environment, then
    /// applies `config_path` on top if given.
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let mut settings = Settings::new()?;
        if let Some(p) = config_path {
            info!("with_override_config from: {}", p);
            settings = settings.with_override_config(p)?;
        }
        Ok(Self::from_settings(settings))
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            ranks: None,
            probe: None,
            provisioner: None,
            store: None,
        }
    }

    pub fn rank_provider(
        mut self,
        ranks: Arc<dyn RankProvider>,
    ) -> Self {
        self.ranks = Some(ranks);
        self
    }

    pub fn probe(
        mut self,
        probe: Arc<dyn LeaderProbe>,
    ) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn provisioner(
        mut self,
        provisioner: Arc<dyn PoolProvisioner>,
    ) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Overrides the store chosen by the storage settings
    pub fn store(
        mut self,
        store: Arc<dyn DirectoryStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    /// Validates the settings and wires every component.
    pub fn build(self) -> Result<PoolService> {
        let settings = self.settings.validate()?;
        let ranks = self.ranks.ok_or_else(|| missing("rank provider"))?;
        let probe = self.probe.ok_or_else(|| missing("leader probe"))?;
        let provisioner = self.provisioner.ok_or_else(|| missing("pool provisioner"))?;
        let store = match self.store {
            Some(s) => s,
            None => open_store(&settings.storage)?,
        };

        let directories = Arc::new(DirectoryRegistry::default());
        let sessions = Arc::new(SessionRegistry::default());
        let locator = Arc::new(LeaderLocator::new(probe, settings.locator.clone()));
        let allocator = ReplicaSetAllocator::new(
            settings.allocator.clone(),
            settings.directory.clone(),
            store.clone(),
        );
        let connections = ConnectionManager::new(
            directories.clone(),
            sessions.clone(),
            locator.clone(),
            settings.connection.clone(),
        );
        let exclusion = ExclusionCoordinator::new(directories.clone(), sessions.clone(), locator.clone());

        info!("pool service assembled: {:?}", settings);
        Ok(PoolService {
            settings,
            ranks,
            provisioner,
            store,
            allocator,
            directories,
            sessions,
            locator,
            connections,
            exclusion,
        })
    }
}

fn missing(component: &str) -> Error {
    Error::InvalidArgument(format!("{component} not configured"))
}
