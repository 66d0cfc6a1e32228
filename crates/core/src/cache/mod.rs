//! SQLite-backed, generation-tagged response cache.
//!
//! This module provides a persistent cache of HTTP responses using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - One store per cache generation, keyed by request identity
//! - Open-or-create semantics for generations
//! - Cascading deletion of a superseded generation's entries
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheStore, EntryMeta};
