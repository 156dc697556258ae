//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Cache Storage implementation with SQLite backend
//! - Request/response model and the asset path policy
//! - The worker script carrying the build-time constants
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod script;

pub use cache::{CacheDb, CachedEntry};
pub use config::{AppConfig, ConfigError, WorkerConfig};
pub use error::Error;
pub use model::{Request, Response, ResponseKind};
pub use policy::{Interception, PassReason, PathPolicy};
pub use script::{ServedScript, WorkerScript};
