//! Service host: registration, lifecycle dispatch and client control.
//!
//! The host plays the platform's role for a [`CacheProxy`]: it runs the
//! install and activate phases, tracks which generation is active or
//! waiting, and routes fetch events to the active proxy once it controls
//! clients. Requests the proxy does not intercept are fetched from the
//! network unmodified.

mod state;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shellcache_core::{Error, ProxyRequest, ProxyResponse, ResponseSource};
use tokio::sync::RwLock;

use crate::fetch::Network;
use crate::proxy::{ActivateReport, CacheProxy, FetchOutcome, InstallReport};

pub use state::WorkerState;

/// Client-control operations a proxy may request from its host.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Activate the installing worker without waiting for old clients to close.
    async fn skip_waiting(&self);

    /// Start controlling all open clients immediately.
    async fn claim(&self);
}

/// A response produced by [`ServiceHost::dispatch_fetch`].
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub response: ProxyResponse,
    pub source: ResponseSource,
}

/// Outcome of [`ServiceHost::register`].
#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub install: InstallReport,
    /// Present when the new worker was activated right away.
    pub activation: Option<ActivateReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub generation_id: String,
    pub state: WorkerState,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostStatus {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub controlling: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Registration {
    installing: Option<Arc<CacheProxy>>,
    waiting: Option<Arc<CacheProxy>>,
    active: Option<Arc<CacheProxy>>,
    skip_waiting: bool,
    controlling: bool,
    activated_at: Option<DateTime<Utc>>,
}

/// Drives cache proxy lifecycles and dispatches fetch events.
pub struct ServiceHost {
    network: Arc<dyn Network>,
    registration: RwLock<Registration>,
}

impl ServiceHost {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network, registration: RwLock::new(Registration::default()) }
    }

    /// Install a proxy and activate it if nothing is active or it asked to
    /// skip waiting. Otherwise it becomes the waiting worker.
    pub async fn register(&self, proxy: Arc<CacheProxy>) -> Result<Registered, Error> {
        {
            let mut reg = self.registration.write().await;
            reg.installing = Some(proxy.clone());
            reg.skip_waiting = false;
        }

        let install = proxy.on_install(self).await;

        let (activate_now, displaced) = {
            let mut reg = self.registration.write().await;
            reg.installing = None;
            let activate_now = reg.active.is_none() || reg.skip_waiting;
            let displaced = if activate_now { None } else { reg.waiting.replace(proxy.clone()) };
            (activate_now, displaced)
        };

        if let Some(displaced) = displaced {
            displaced.set_state(WorkerState::Redundant).await;
        }

        let activation = if activate_now { Some(self.activate(proxy).await?) } else { None };

        Ok(Registered { install, activation })
    }

    /// Promote the waiting worker, if any.
    pub async fn activate_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        let waiting = self.registration.write().await.waiting.take();
        match waiting {
            Some(proxy) => Ok(Some(self.activate(proxy).await?)),
            None => Ok(None),
        }
    }

    async fn activate(&self, proxy: Arc<CacheProxy>) -> Result<ActivateReport, Error> {
        proxy.set_state(WorkerState::Activating).await;
        let previous = {
            let mut reg = self.registration.write().await;
            if reg.waiting.as_ref().is_some_and(|w| Arc::ptr_eq(w, &proxy)) {
                reg.waiting = None;
            }
            reg.active.replace(proxy.clone())
        };
        let superseded = previous.clone().filter(|p| !Arc::ptr_eq(p, &proxy));

        // The old generation is about to be deleted. Once redundant the old
        // worker starts no new writes; the ones already running land first.
        if let Some(old) = &superseded {
            old.set_state(WorkerState::Redundant).await;
            old.settle().await;
        }

        match proxy.on_activate(self).await {
            Ok(report) => {
                self.registration.write().await.activated_at = Some(Utc::now());
                tracing::info!(generation = %report.generation, removed = ?report.removed, "generation activated");
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(generation = %proxy.generation_id(), error = %e, "activation failed");
                if let Some(old) = &superseded {
                    old.set_state(WorkerState::Activated).await;
                }
                self.registration.write().await.active = previous;
                Err(e)
            }
        }
    }

    /// Answer a client request.
    ///
    /// Requests the active worker does not answer go to the network, as does
    /// everything while no worker controls clients. A transport failure on
    /// those paths is returned as an error.
    pub async fn dispatch_fetch(&self, request: &ProxyRequest) -> Result<Dispatched, Error> {
        let active = {
            let reg = self.registration.read().await;
            if reg.controlling { reg.active.clone() } else { None }
        };
        let active = match active {
            Some(proxy) => proxy.state().await.can_intercept().then_some(proxy),
            None => None,
        };

        let Some(proxy) = active else {
            let response = self.network.fetch(request).await?;
            return Ok(Dispatched { response, source: ResponseSource::Uncontrolled });
        };

        match proxy.on_fetch(request).await {
            FetchOutcome::Respond(response, source) => Ok(Dispatched { response, source }),
            FetchOutcome::Passthrough => {
                let response = self.network.fetch(request).await?;
                Ok(Dispatched { response, source: ResponseSource::Passthrough })
            }
        }
    }

    pub async fn active(&self) -> Option<Arc<CacheProxy>> {
        self.registration.read().await.active.clone()
    }

    pub async fn status(&self) -> HostStatus {
        let (active, waiting, controlling, activated_at) = {
            let reg = self.registration.read().await;
            (reg.active.clone(), reg.waiting.clone(), reg.controlling, reg.activated_at)
        };

        HostStatus {
            active: worker_status(active).await,
            waiting: worker_status(waiting).await,
            controlling,
            activated_at,
        }
    }

    /// Wait for background cache writes of the active and waiting workers.
    pub async fn settle(&self) {
        let (active, waiting) = {
            let reg = self.registration.read().await;
            (reg.active.clone(), reg.waiting.clone())
        };
        for proxy in [active, waiting].into_iter().flatten() {
            proxy.settle().await;
        }
    }
}

async fn worker_status(proxy: Option<Arc<CacheProxy>>) -> Option<WorkerStatus> {
    match proxy {
        Some(proxy) => {
            Some(WorkerStatus { generation_id: proxy.generation_id().to_string(), state: proxy.state().await })
        }
        None => None,
    }
}

#[async_trait]
impl ClientControl for ServiceHost {
    async fn skip_waiting(&self) {
        self.registration.write().await.skip_waiting = true;
    }

    async fn claim(&self) {
        let mut reg = self.registration.write().await;
        if !reg.controlling {
            tracing::info!("claiming open clients");
        }
        reg.controlling = true;
    }
}
