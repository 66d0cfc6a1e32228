//! Offline cache proxy for an application shell.
//!
//! One [`CacheProxy`] owns one cache generation and handles its three
//! lifecycle events:
//!
//! ### Install
//! - Open (create-if-absent) the generation's store.
//! - Fetch and store every seed URL; failures are logged, never fatal.
//! - Ask the host to skip the waiting phase, unless the deployment opts out.
//!
//! ### Activate
//! - Delete every other generation, then claim all clients.
//!
//! ### Fetch
//! - Non-GET and API requests pass through untouched.
//! - Navigations are network first, falling back to the cached fallback
//!   document, then to an offline placeholder.
//! - Sub-resources are cache first, falling back to the network, then to a
//!   placeholder.
//!
//! Successful network responses are persisted in the background; call
//! [`CacheProxy::settle`] to wait for those writes. A redundant worker starts
//! no new writes, so its purged generation stays deleted.

pub mod route;

use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;
use serde::Serialize;
use shellcache_core::{
    AppConfig, CacheDb, CacheStore, DeploymentConfig, Error, ProxyRequest, ProxyResponse, ResponseSource,
};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, resolve};
use crate::host::{ClientControl, WorkerState};
use route::{Route, classify};

/// Resolved, ready-to-use proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub generation_id: String,
    pub origin: Url,
    pub seed_urls: Vec<Url>,
    pub fallback_url: Url,
    pub offline_body: String,
    pub subresource_placeholder: String,
    pub fallback_on_error_status: bool,
    pub skip_waiting: bool,
    pub passthrough: Vec<Regex>,
}

impl ProxyConfig {
    /// Resolve a deployment against its origin and compile passthrough patterns.
    pub fn new(origin: &str, deployment: &DeploymentConfig, patterns: &[String]) -> Result<Self, Error> {
        let origin = Url::parse(origin).map_err(|e| Error::InvalidUrl(format!("{origin}: {e}")))?;
        let resolve_one =
            |target: &str| resolve(&origin, target).map_err(|e| Error::InvalidUrl(format!("{target}: {e}")));

        let seed_urls = deployment
            .seed_urls
            .iter()
            .map(|seed| resolve_one(seed))
            .collect::<Result<Vec<_>, _>>()?;
        let fallback_url = resolve_one(&deployment.fallback_document)?;

        let passthrough = patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidInput(format!("passthrough pattern {p}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            generation_id: deployment.generation_id.clone(),
            origin,
            seed_urls,
            fallback_url,
            offline_body: deployment.offline_body.clone(),
            subresource_placeholder: deployment.subresource_placeholder.clone(),
            fallback_on_error_status: deployment.fallback_on_error_status,
            skip_waiting: deployment.skip_waiting,
            passthrough,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.origin, &config.deployment, &config.passthrough_patterns)
    }

    /// Same policy under another generation id (a new deployed build).
    pub fn with_generation(mut self, generation_id: impl Into<String>) -> Self {
        self.generation_id = generation_id.into();
        self
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }
}

/// A seed URL that could not be cached during install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of the install phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: Vec<String>,
    pub failed: Vec<SeedFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of the activate phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    /// Superseded generations that were deleted.
    pub removed: Vec<String>,
}

/// Result of a fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host forwards the request to the network as-is.
    Passthrough,
    /// The proxy answered the request.
    Respond(ProxyResponse, ResponseSource),
}

/// Cache proxy for one generation of an application shell.
pub struct CacheProxy {
    config: ProxyConfig,
    db: CacheDb,
    store: CacheStore,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    writes: Mutex<Writes>,
}

#[derive(Default)]
struct Writes {
    // Dropping the set aborts writes still in flight.
    tasks: JoinSet<()>,
    retired: bool,
}

impl CacheProxy {
    pub fn new(config: ProxyConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let store = db.store(&config.generation_id);
        Self {
            config,
            db,
            store,
            network,
            state: RwLock::new(WorkerState::Parsed),
            writes: Mutex::new(Writes::default()),
        }
    }

    pub fn generation_id(&self) -> &str {
        &self.config.generation_id
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// This generation's store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().await;
        if *current != state {
            tracing::info!(
                generation = %self.config.generation_id,
                from = %*current,
                to = %state,
                "worker state change"
            );
            *current = state;
            self.writes.lock().unwrap_or_else(PoisonError::into_inner).retired = state == WorkerState::Redundant;
        }
    }

    /// Install: pre-cache the seed list, then request immediate activation
    /// when configured to skip waiting.
    pub async fn on_install(&self, control: &dyn ClientControl) -> InstallReport {
        self.set_state(WorkerState::Installing).await;

        let generation = self.config.generation_id.clone();
        let mut report = InstallReport { generation: generation.clone(), cached: Vec::new(), failed: Vec::new() };

        match self.db.open_generation(&generation).await {
            Ok(store) => {
                for url in &self.config.seed_urls {
                    match self.seed(&store, url).await {
                        Ok(()) => report.cached.push(url.to_string()),
                        Err(e) => {
                            tracing::warn!(generation = %generation, url = %url, error = %e, "cache install error");
                            report.failed.push(SeedFailure { url: url.to_string(), reason: e.to_string() });
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(generation = %generation, error = %e, "cache install error: store unavailable");
                report.failed = self
                    .config
                    .seed_urls
                    .iter()
                    .map(|url| SeedFailure { url: url.to_string(), reason: e.to_string() })
                    .collect();
            }
        }

        if self.config.skip_waiting {
            control.skip_waiting().await;
        }
        self.set_state(WorkerState::Installed).await;

        tracing::info!(
            generation = %generation,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "install complete"
        );
        report
    }

    async fn seed(&self, store: &CacheStore, url: &Url) -> Result<(), Error> {
        let request = ProxyRequest::get(url.clone());
        let response = self.network.fetch(&request).await?;
        if !response.ok() {
            return Err(Error::Network(format!("{url}: status {}", response.status)));
        }
        store.put(&request, &response).await
    }

    /// Activate: delete every other generation, then claim clients.
    ///
    /// A failed deletion aborts activation before clients are claimed.
    pub async fn on_activate(&self, control: &dyn ClientControl) -> Result<ActivateReport, Error> {
        self.set_state(WorkerState::Activating).await;

        match self.sweep_generations().await {
            Ok(removed) => {
                control.claim().await;
                self.set_state(WorkerState::Activated).await;
                Ok(ActivateReport { generation: self.config.generation_id.clone(), removed })
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn sweep_generations(&self) -> Result<Vec<String>, Error> {
        let mut removed = Vec::new();
        for id in self.db.generation_ids().await? {
            if id != self.config.generation_id {
                self.db.delete_generation(&id).await?;
                tracing::info!(generation = %self.config.generation_id, stale = %id, "deleted stale cache generation");
                removed.push(id);
            }
        }
        Ok(removed)
    }

    /// Fetch: decide how to answer one request. Never fails.
    pub async fn on_fetch(&self, request: &ProxyRequest) -> FetchOutcome {
        match classify(request, &self.config.passthrough) {
            Route::Passthrough(reason) => {
                tracing::debug!("passthrough {} {} ({:?})", request.method, request.url, reason);
                FetchOutcome::Passthrough
            }
            Route::Navigation => {
                let (response, source) = self.network_first(request).await;
                FetchOutcome::Respond(response, source)
            }
            Route::Subresource => {
                let (response, source) = self.cache_first(request).await;
                FetchOutcome::Respond(response, source)
            }
        }
    }

    async fn network_first(&self, request: &ProxyRequest) -> (ProxyResponse, ResponseSource) {
        match self.network.fetch(request).await {
            Ok(response) if response.ok() => {
                self.persist(request.clone(), response.clone());
                (response, ResponseSource::Network)
            }
            Ok(response) if !self.config.fallback_on_error_status => (response, ResponseSource::Network),
            Ok(response) => {
                tracing::warn!(url = %request.url, status = response.status, "navigation failed, serving fallback");
                self.offline_fallback().await
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "navigation failed, serving fallback");
                self.offline_fallback().await
            }
        }
    }

    async fn offline_fallback(&self) -> (ProxyResponse, ResponseSource) {
        let fallback = ProxyRequest::get(self.config.fallback_url.clone());
        match self.store.match_request(&fallback).await {
            Ok(Some(cached)) => return (cached, ResponseSource::Fallback),
            Ok(None) => {
                tracing::warn!(fallback = %self.config.fallback_url, "fallback document not cached");
            }
            Err(e) => {
                tracing::warn!(fallback = %self.config.fallback_url, error = %e, "cache read error");
            }
        }
        (ProxyResponse::placeholder(&self.config.offline_body), ResponseSource::Placeholder)
    }

    async fn cache_first(&self, request: &ProxyRequest) -> (ProxyResponse, ResponseSource) {
        match self.store.match_request(request).await {
            Ok(Some(cached)) => {
                tracing::debug!("cache hit for {}", request.url);
                return (cached, ResponseSource::Cache);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache read error, treating as miss"),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.persist(request.clone(), response.clone());
                }
                (response, ResponseSource::Network)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "sub-resource unavailable");
                (ProxyResponse::placeholder(&self.config.subresource_placeholder), ResponseSource::Placeholder)
            }
        }
    }

    /// Store a response without delaying delivery to the client.
    ///
    /// Dropped once the worker is redundant: its generation may already be
    /// purged and a late write would recreate it.
    fn persist(&self, request: ProxyRequest, response: ProxyResponse) {
        let mut writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        if writes.retired {
            tracing::debug!(
                generation = %self.config.generation_id,
                url = %request.url,
                "worker redundant, write dropped"
            );
            return;
        }

        let store = self.store.clone();
        while writes.tasks.try_join_next().is_some() {}
        writes.tasks.spawn(async move {
            if let Err(e) = store.put(&request, &response).await {
                tracing::warn!(url = %request.url, error = %e, "cache write error");
            }
        });
    }

    /// Wait for every background cache write started so far.
    pub async fn settle(&self) {
        let mut pending = {
            let mut writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut writes.tasks)
        };
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background cache write did not finish");
            }
        }
    }
}
