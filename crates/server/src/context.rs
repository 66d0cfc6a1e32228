//! Shared state behind the MCP tools.

use std::sync::Arc;

use shellcache_client::{CacheProxy, Network, ProxyConfig, Registered, ServiceHost};
use shellcache_core::{AppConfig, CacheDb, Error};

pub struct ServerContext {
    config: AppConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    host: ServiceHost,
}

impl ServerContext {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let host = ServiceHost::new(network.clone());
        Self { config, db, network, host }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn host(&self) -> &ServiceHost {
        &self.host
    }

    /// Proxy for the configured deployment under `generation_id`.
    ///
    /// `skip_waiting` overrides the deployment setting when given.
    pub fn proxy_for(&self, generation_id: &str, skip_waiting: Option<bool>) -> Result<Arc<CacheProxy>, Error> {
        let mut config = ProxyConfig::from_app_config(&self.config)?.with_generation(generation_id);
        if let Some(skip_waiting) = skip_waiting {
            config = config.with_skip_waiting(skip_waiting);
        }
        Ok(Arc::new(CacheProxy::new(config, self.db.clone(), self.network.clone())))
    }

    /// Register the generation named in the configuration.
    pub async fn install_configured(&self) -> Result<Registered, Error> {
        let proxy = self.proxy_for(&self.config.deployment.generation_id, None)?;
        self.host.register(proxy).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use shellcache_client::{FetchConfig, HttpNetwork};
    use std::time::Duration;

    /// Context whose origin refuses every connection.
    pub(crate) async fn offline_context() -> Arc<ServerContext> {
        let config = AppConfig { origin: "http://127.0.0.1:1".into(), ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = HttpNetwork::new(FetchConfig { timeout: Duration::from_secs(2), ..Default::default() }).unwrap();
        Arc::new(ServerContext::new(config, db, Arc::new(network)))
    }
}
