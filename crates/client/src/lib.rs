//! Client side of swcache.
//!
//! This crate provides the network seam, the cache worker with its fetch
//! policy, the platform host that drives worker lifecycles, and the
//! page registrar. Shared by the server and tests.

pub mod fetch;
pub mod host;
pub mod registrar;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{HttpNetwork, Network, NetworkConfig, NetworkError};
pub use host::{
    ClientId, ClientInfo, NetworkScriptSource, Registration, RegistrationError, Route, ScriptSource,
    ServiceWorkerContainer, WorkerHost, WorkerInfo,
};
pub use registrar::Registrar;
pub use worker::{Admission, CacheWorker, FetchOutcome, ResponseSource, WorkerId, WorkerState};
