//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Generation-tagged response cache with SQLite backend
//! - Request/response model shared by the proxy and the server
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod message;

pub use cache::{CacheDb, CacheStore, EntryMeta};
pub use config::{AppConfig, ConfigError, DeploymentConfig, ShellApp};
pub use error::Error;
pub use message::{ProxyRequest, ProxyResponse, RequestMode, ResponseSource};
