//! In-process stand-ins for the network and the client-control API.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shellcache_core::{Error, ProxyRequest, ProxyResponse};

use crate::fetch::Network;
use crate::host::ClientControl;

pub(crate) fn html(body: &str) -> ProxyResponse {
    ProxyResponse::new(200, body.to_string()).with_header("content-type", "text/html; charset=utf-8")
}

/// Scripted network: routed URLs answer with their response, unrouted URLs
/// with 404, failing URLs (or everything while offline) with an error.
/// Delayed URLs answer only after sleeping.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, ProxyResponse>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(&self, url: &str, response: ProxyResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url.as_str();

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(url) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }

        let routed = self.routes.lock().unwrap().get(url).cloned();
        Ok(routed.unwrap_or_else(|| ProxyResponse::new(404, "not found")))
    }
}

#[derive(Default)]
pub(crate) struct RecordingControl {
    skip_waiting: AtomicBool,
    claimed: AtomicBool,
}

impl RecordingControl {
    pub(crate) fn skipped_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub(crate) fn claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientControl for RecordingControl {
    async fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    async fn claim(&self) {
        self.claimed.store(true, Ordering::SeqCst);
    }
}

/// Make every later generation delete on the database at `path` fail.
pub(crate) async fn block_generation_deletes(path: &Path) {
    let conn = tokio_rusqlite::Connection::open(path).await.unwrap();
    conn.call(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER block_generation_deletes BEFORE DELETE ON generations
             BEGIN SELECT RAISE(ABORT, 'generation deletes are blocked'); END;",
        )
    })
    .await
    .unwrap();
}
