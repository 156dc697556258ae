//! SQLite-backed Cache Storage for the asset worker.
//!
//! This module provides named, versioned cache stores persisted in SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Request-keyed entries (method + URL, hashed with SHA-256)
//! - Lazily created stores, deleted wholesale by name
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedEntry, EntrySummary};
