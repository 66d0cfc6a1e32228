//! Client code for shellcache.
//!
//! This crate provides the network fetch seam, the cache proxy implementing
//! the offline policy, and the service host that drives its lifecycle.

pub mod fetch;
pub mod host;
pub mod proxy;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchConfig, HttpNetwork, Network, UrlError, canonicalize, resolve};
pub use host::{ClientControl, Dispatched, HostStatus, Registered, ServiceHost, WorkerState, WorkerStatus};
pub use proxy::{ActivateReport, CacheProxy, FetchOutcome, InstallReport, ProxyConfig, SeedFailure};
