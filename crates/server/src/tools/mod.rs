//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.
#![allow(unused_imports)]

pub mod asset;
pub mod cache;
pub mod worker;

pub use asset::{AssetFetchOutput, AssetFetchParams};
pub use cache::CacheKeysParams;
pub use worker::{WorkerScriptParams, WorkerStatusParams, WorkerUpdateParams};
