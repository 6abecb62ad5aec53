//! Registry of street-network backends, per deployment.
//!
//! Backends come from two sources:
//! - static configuration, completed with engine defaults at startup
//! - a backing store, polled by [`StreetNetworkBackendManager::refresh`]
//!
//! Once the store holds any record for a deployment, those records fully
//! replace its static configuration. Each refresh builds a new snapshot and
//! swaps it in; readers never wait on a refresh.

mod config;
mod factory;
mod store;

pub use config::{BackendConfig, DeploymentConfig, ManagerConfig, with_defaults};
pub use factory::{BackendClass, BackendFactory, ConfigError};
pub use store::{BackendStore, FileBackendStore, StoreError, StoredBackend};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::StreetNetworkMode;
use crate::network::{BackendStatus, StreetNetworkService};

/// Error resolving a backend. Never answered by falling back to another
/// backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown deployment {0}")]
    UnknownDeployment(String),

    #[error("no street network backend {id} in deployment {deployment}")]
    UnknownBackend { deployment: String, id: String },

    #[error("no street network backend for mode {mode} in deployment {deployment}")]
    UnresolvedMode {
        deployment: String,
        mode: StreetNetworkMode,
    },
}

/// Backends of one deployment, by id and by mode.
#[derive(Clone, Default)]
pub struct BackendSet {
    by_id: BTreeMap<String, Arc<dyn StreetNetworkService>>,
    by_mode: HashMap<StreetNetworkMode, String>,
}

impl BackendSet {
    /// Add a backend; it takes over its modes from earlier backends.
    fn insert(&mut self, service: Arc<dyn StreetNetworkService>) {
        let id = service.id().to_string();
        for mode in service.modes() {
            if let Some(previous) = self.by_mode.insert(*mode, id.clone())
                && previous != id
            {
                debug!(%mode, backend = %id, replaced = %previous, "mode claimed twice");
            }
        }
        self.by_id.insert(id, service);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn StreetNetworkService>> {
        self.by_id.get(id)
    }

    pub fn for_mode(&self, mode: StreetNetworkMode) -> Option<&Arc<dyn StreetNetworkService>> {
        self.by_mode.get(&mode).and_then(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Status of every backend, by id.
    pub fn statuses(&self) -> Vec<BackendStatus> {
        self.by_id.values().map(|s| s.status()).collect()
    }
}

/// A stored record turned into a backend.
#[derive(Clone)]
struct Applied {
    service: Arc<dyn StreetNetworkService>,
    applied_at: Option<DateTime<Utc>>,
}

/// Backends built from the store for one deployment.
#[derive(Clone, Default)]
struct StoredDeployment {
    applied: BTreeMap<String, Applied>,
    set: BackendSet,
}

impl StoredDeployment {
    fn index(&mut self) {
        let mut applied: Vec<&Applied> = self.applied.values().collect();
        applied.sort_by_key(|a| a.applied_at);

        let mut set = BackendSet::default();
        for entry in applied {
            set.insert(entry.service.clone());
        }
        self.set = set;
    }
}

type StoredSnapshot = HashMap<String, StoredDeployment>;

/// What a call to [`StreetNetworkBackendManager::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No store, or the last refresh is too recent
    Skipped,
    Applied {
        /// Records (re)built
        built: usize,
        /// Records already applied and unchanged
        kept: usize,
        /// Records that could not be built
        failed: usize,
    },
}

/// Resolves the backend to use for a deployment and a mode.
pub struct StreetNetworkBackendManager {
    config: ManagerConfig,
    factories: HashMap<String, BackendFactory>,
    statics: HashMap<String, BackendSet>,
    store: Option<Arc<dyn BackendStore>>,
    stored: ArcSwap<StoredSnapshot>,
    last_refresh: Mutex<Option<Instant>>,
}

impl StreetNetworkBackendManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            factories: HashMap::new(),
            statics: HashMap::new(),
            store: None,
            stored: ArcSwap::from_pointee(StoredSnapshot::new()),
            last_refresh: Mutex::new(None),
        }
    }

    /// Poll `store` on [`refresh`](Self::refresh).
    pub fn with_store(mut self, store: Arc<dyn BackendStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a deployment and build its static backends, defaults
    /// included. Backends that fail to build are logged and left out.
    ///
    /// Returns the number of backends built.
    pub fn add_deployment(&mut self, factory: BackendFactory, configs: Vec<BackendConfig>) -> usize {
        let deployment = factory.deployment().to_string();
        let mut set = BackendSet::default();

        for config in with_defaults(configs) {
            match factory.build(&config) {
                Ok(service) => set.insert(service),
                Err(e) => error!(
                    deployment = %deployment,
                    backend = %config.id_or_default(),
                    error = %e,
                    "cannot build street network backend"
                ),
            }
        }

        let built = set.len();
        info!(deployment = %deployment, backends = built, "deployment registered");
        self.statics.insert(deployment.clone(), set);
        self.factories.insert(deployment, factory);
        built
    }

    /// Registered deployment names.
    pub fn deployments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn update_interval(&self) -> std::time::Duration {
        self.config.update_interval()
    }

    /// Start a refresh unless the previous one is more recent than the
    /// update interval.
    fn claim_refresh(&self) -> bool {
        let mut last = self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if let Some(at) = *last
            && now.duration_since(at) < self.config.update_interval()
        {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Reload the backing store and swap in the backends it describes.
    ///
    /// A record is rebuilt only when it is newer than the backend already
    /// applied for its id; the newest record of an id wins. A record that
    /// fails to build is logged and skipped (the backend previously applied
    /// for its id, if any, stays).
    ///
    /// # Errors
    ///
    /// Returns `Err` if the store cannot be read; current backends are kept.
    pub async fn refresh(&self) -> Result<RefreshOutcome, StoreError> {
        let Some(store) = &self.store else {
            return Ok(RefreshOutcome::Skipped);
        };
        if !self.claim_refresh() {
            return Ok(RefreshOutcome::Skipped);
        }
        self.reload(store.as_ref()).await
    }

    /// [`refresh`](Self::refresh) without the update-interval throttle, for
    /// callers that already pace themselves (the refresh timer).
    ///
    /// # Errors
    ///
    /// Returns `Err` if the store cannot be read; current backends are kept.
    pub async fn refresh_now(&self) -> Result<RefreshOutcome, StoreError> {
        let Some(store) = &self.store else {
            return Ok(RefreshOutcome::Skipped);
        };
        *self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.reload(store.as_ref()).await
    }

    async fn reload(&self, store: &dyn BackendStore) -> Result<RefreshOutcome, StoreError> {
        let mut records = match store.load().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "keeping current street network backends");
                return Err(e);
            }
        };
        // Oldest first: a later record of the same id replaces an earlier one
        records.sort_by_key(StoredBackend::last_modified);

        let current = self.stored.load();
        let mut next = StoredSnapshot::new();
        let (mut built, mut kept, mut failed) = (0, 0, 0);

        for record in &records {
            let Some(factory) = self.factories.get(&record.deployment) else {
                warn!(
                    deployment = %record.deployment,
                    backend = %record.id,
                    "record for an unknown deployment"
                );
                failed += 1;
                continue;
            };

            let stamp = record.last_modified();
            let previous = current
                .get(&record.deployment)
                .and_then(|d| d.applied.get(&record.id));
            let deployment = next.entry(record.deployment.clone()).or_default();

            if let Some(previous) = previous
                && previous.applied_at >= stamp
            {
                deployment.applied.insert(record.id.clone(), previous.clone());
                kept += 1;
                continue;
            }

            match factory.build(&record.to_config()) {
                Ok(service) => {
                    deployment.applied.insert(
                        record.id.clone(),
                        Applied {
                            service,
                            applied_at: stamp,
                        },
                    );
                    built += 1;
                }
                Err(e) => {
                    error!(
                        deployment = %record.deployment,
                        backend = %record.id,
                        error = %e,
                        "cannot build street network backend"
                    );
                    if let Some(previous) = previous {
                        deployment.applied.insert(record.id.clone(), previous.clone());
                    }
                    failed += 1;
                }
            }
        }

        for deployment in next.values_mut() {
            deployment.index();
        }
        self.stored.store(Arc::new(next));

        info!(built, kept, failed, "street network backends refreshed");
        Ok(RefreshOutcome::Applied {
            built,
            kept,
            failed,
        })
    }

    /// Run `f` on the backends currently answering for `deployment`.
    fn with_active<T>(
        &self,
        deployment: &str,
        f: impl FnOnce(&BackendSet) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let stored = self.stored.load();
        if let Some(from_store) = stored.get(deployment) {
            return f(&from_store.set);
        }
        let set = self
            .statics
            .get(deployment)
            .ok_or_else(|| ResolveError::UnknownDeployment(deployment.to_string()))?;
        f(set)
    }

    /// The backend to use for `mode` in `deployment`.
    ///
    /// A `backend_id` override wins outright, whatever modes that backend
    /// is configured for.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the deployment, the override or the mode is unknown.
    pub fn resolve(
        &self,
        deployment: &str,
        mode: StreetNetworkMode,
        backend_id: Option<&str>,
    ) -> Result<Arc<dyn StreetNetworkService>, ResolveError> {
        self.with_active(deployment, |set| {
            let found = match backend_id {
                Some(id) => set.get(id).ok_or_else(|| ResolveError::UnknownBackend {
                    deployment: deployment.to_string(),
                    id: id.to_string(),
                }),
                None => set.for_mode(mode).ok_or_else(|| ResolveError::UnresolvedMode {
                    deployment: deployment.to_string(),
                    mode,
                }),
            }?;
            Ok(found.clone())
        })
    }

    /// Status of every backend answering for `deployment`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the deployment is unknown.
    pub fn statuses(&self, deployment: &str) -> Result<Vec<BackendStatus>, ResolveError> {
        self.with_active(deployment, |set| Ok(set.statuses()))
    }
}
