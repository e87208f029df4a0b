//! Cache lifecycle controller.
//!
//! Keeps exactly one generation of static assets current and answers
//! requests network-first with cache fallback.
//!
//! ### Install
//! - Fetch every manifest asset; each must reach the network and return 2xx.
//! - All-or-nothing: the generation is written in one transaction, or not
//!   at all. A failed install leaves the previous generation untouched.
//!
//! ### Activate
//! - Delete every generation other than the current version, concurrently.
//! - Delete failures are logged and not retried.
//!
//! ### Fetch
//! - Network first. Successful responses are returned immediately and a copy
//!   is stored in the background.
//! - On network failure the stored entry is replayed; without one the
//!   original error propagates.

pub mod lifecycle;
pub mod manifest;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::task::TaskTracker;

use rutas_core::cache::GenerationInfo;
use rutas_core::{AppConfig, CacheDb, Error, RequestIdentity, ResponseSnapshot, StorePolicy};

use crate::fetch::Network;

pub use lifecycle::WorkerState;
pub use manifest::AssetManifest;

/// Lifecycle policy switches.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Activate right after install instead of waiting.
    pub skip_waiting: bool,
    /// Start intercepting as soon as activation finishes.
    pub claim_clients: bool,
    pub store_policy: StorePolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ControllerOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            skip_waiting: config.skip_waiting,
            claim_clients: config.claim_clients,
            store_policy: config.store_policy,
        }
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Live network response while controlling.
    Network,
    /// Replayed from the current generation after a network failure.
    Fallback,
    /// Not controlling: straight from the network, cache untouched.
    Passthrough,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Fallback => "fallback",
            Source::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub source: Source,
    pub response: ResponseSnapshot,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub version: String,
    pub controlling: bool,
    pub generations: Vec<GenerationInfo>,
}

pub struct CacheController {
    db: CacheDb,
    network: Arc<dyn Network>,
    manifest: AssetManifest,
    version: String,
    options: ControllerOptions,
    state: RwLock<WorkerState>,
    controlling: AtomicBool,
    lifecycle: Mutex<()>,
    writes: TaskTracker,
}

impl CacheController {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, manifest: AssetManifest, version: impl Into<String>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            db,
            network,
            manifest,
            version: version.into(),
            options,
            state: RwLock::new(WorkerState::Uninstalled),
            controlling: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            writes: TaskTracker::new(),
        }
    }

    /// Controller for the configured origin, manifest, version and policy.
    pub fn from_config(db: CacheDb, network: Arc<dyn Network>, config: &AppConfig) -> Result<Self, Error> {
        let manifest = AssetManifest::from_config(config)?;
        Ok(Self::new(db, network, manifest, config.cache_version.clone(), ControllerOptions::from(config)))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether intercepted requests go through the cache.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    /// Start intercepting now, without waiting for the next start.
    pub async fn claim(&self) -> Result<(), Error> {
        let state = self.state().await;
        if state != WorkerState::Active {
            return Err(Error::InvalidState { action: "claim clients", state: state.to_string() });
        }
        self.controlling.store(true, Ordering::SeqCst);
        tracing::info!(version = %self.version, "controller claimed clients");
        Ok(())
    }

    /// Bring the controller up for this start.
    ///
    /// A generation that an earlier run already activated is resumed as-is;
    /// assets are only re-fetched when the version changes. Otherwise the
    /// current version is installed, then activated when `skip_waiting` is set
    /// or nothing else is stored.
    pub async fn register(&self) -> Result<WorkerStatus, Error> {
        let generations = self.db.list_generations().await?;
        let installed = generations.iter().any(|g| *g == self.version);
        let others = generations.iter().filter(|g| **g != self.version).count();

        if installed && others == 0 {
            self.set_state(WorkerState::Active).await;
            self.controlling.store(true, Ordering::SeqCst);
            tracing::info!(version = %self.version, "resuming active cache generation");
            return self.status().await;
        }

        if installed {
            self.set_state(WorkerState::Installed).await;
            tracing::info!(version = %self.version, stale = others, "cache generation already installed");
        } else {
            self.install().await?;
        }

        if self.options.skip_waiting || others == 0 {
            self.activate().await?;
        } else {
            tracing::info!(
                version = %self.version,
                stale = others,
                "new cache generation waiting for activation"
            );
        }

        self.status().await
    }

    /// Create the current generation from the asset manifest.
    ///
    /// Returns the number of assets stored.
    pub async fn install(&self) -> Result<u64, Error> {
        let _guard = self.lifecycle.lock().await;
        let previous = self.transition(WorkerState::Installing, "install").await?;

        tracing::info!(
            version = %self.version,
            assets = self.manifest.assets().len(),
            "installing cache generation"
        );

        let result = match self.fetch_manifest().await {
            Ok(snapshots) => self.db.install_generation(&self.version, snapshots).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(written) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(version = %self.version, assets = written, "cache generation installed");
                Ok(written)
            }
            Err(e) => {
                let restored = if previous == WorkerState::Installed || previous == WorkerState::Active {
                    previous
                } else {
                    WorkerState::Uninstalled
                };
                self.set_state(restored).await;
                tracing::warn!(version = %self.version, error = %e, "cache generation discarded");
                Err(e)
            }
        }
    }

    async fn fetch_manifest(&self) -> Result<Vec<ResponseSnapshot>, Error> {
        let identities = self.manifest.identities()?;

        let fetches = identities.into_iter().map(|(asset, identity)| async move {
            let response = self
                .network
                .fetch(&identity)
                .await
                .map_err(|e| Error::InstallFailed { asset: asset.clone(), reason: e.to_string() })?;

            if !response.status.is_success() {
                return Err(Error::InstallFailed { asset, reason: format!("status {}", response.status.as_u16()) });
            }

            Ok(response.to_snapshot(&identity))
        });

        try_join_all(fetches).await
    }

    /// Make the current generation the only one and start serving from it.
    ///
    /// Returns the number of stale generations deleted.
    pub async fn activate(&self) -> Result<usize, Error> {
        let _guard = self.lifecycle.lock().await;
        self.transition(WorkerState::Activating, "activate").await?;

        tracing::info!(version = %self.version, "activating cache generation");

        let stale: Vec<String> = match self.db.list_generations().await {
            Ok(generations) => generations.into_iter().filter(|g| *g != self.version).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not list cache generations; skipping cleanup");
                Vec::new()
            }
        };

        let deletions = stale.iter().map(|version| async move {
            let result = self.db.delete_generation(version).await;
            (version, result)
        });

        let mut deleted = 0;
        for (version, result) in join_all(deletions).await {
            match result {
                Ok(true) => {
                    tracing::info!(stale = %version, "deleted old cache generation");
                    deleted += 1;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(stale = %version, error = %e, "failed to delete old cache generation"),
            }
        }

        self.set_state(WorkerState::Active).await;
        if self.options.claim_clients {
            self.controlling.store(true, Ordering::SeqCst);
            tracing::debug!(version = %self.version, "controller claimed clients");
        }

        Ok(deleted)
    }

    /// Answer a request network-first with cache fallback.
    pub async fn handle_fetch(&self, identity: &RequestIdentity) -> Result<FetchOutcome, Error> {
        if !self.is_controlling() {
            let response = self.network.fetch(identity).await?;
            return Ok(FetchOutcome { source: Source::Passthrough, response: response.to_snapshot(identity) });
        }

        match self.network.fetch(identity).await {
            Ok(response) => {
                let snapshot = response.to_snapshot(identity);
                if self.options.store_policy.allows(&snapshot) {
                    self.store_in_background(snapshot.clone());
                } else {
                    tracing::debug!(request = %identity, status = snapshot.status, "response not cached");
                }
                Ok(FetchOutcome { source: Source::Network, response: snapshot })
            }
            Err(err) if err.is_network_failure() => match self.db.match_entry(&self.version, identity).await {
                Ok(Some(cached)) => {
                    tracing::debug!(request = %identity, error = %err, "serving cached response");
                    Ok(FetchOutcome { source: Source::Fallback, response: cached })
                }
                Ok(None) => {
                    tracing::debug!(request = %identity, "network failed and nothing cached");
                    Err(err)
                }
                Err(db_err) => {
                    tracing::warn!(request = %identity, error = %db_err, "cache lookup failed");
                    Err(err)
                }
            },
            Err(err) => Err(err),
        }
    }

    fn store_in_background(&self, snapshot: ResponseSnapshot) {
        let db = self.db.clone();
        let version = self.version.clone();
        self.writes.spawn(async move {
            if let Err(e) = db.put_entry(&version, &snapshot).await {
                tracing::warn!(url = %snapshot.url, error = %e, "failed to cache response");
            }
        });
    }

    /// Wait for every background cache write started so far.
    pub async fn wait_until_idle(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        Ok(WorkerStatus {
            state: self.state().await,
            version: self.version.clone(),
            controlling: self.is_controlling(),
            generations: self.db.generation_info().await?,
        })
    }

    async fn transition(&self, next: WorkerState, action: &'static str) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        let previous = *state;
        if !previous.can_transition(next) {
            return Err(Error::InvalidState { action, state: previous.to_string() });
        }
        *state = next;
        Ok(previous)
    }

    async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
    }
}
