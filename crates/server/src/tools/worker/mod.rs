//! Worker-related MCP tools.
//!
//! This module provides tools for inspecting and updating the worker.

pub mod script;
pub mod status;
pub mod update;

pub use script::{WorkerScriptParams, script_impl};
pub use status::{WorkerStatusParams, status_impl};
pub use update::{WorkerUpdateParams, update_impl};
