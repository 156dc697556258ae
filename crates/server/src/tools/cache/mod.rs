//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting Cache Storage.

pub mod keys;

pub use keys::{CacheKeysParams, keys_impl};
