//! Worker lifecycle states and the transitions allowed between them.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a cache worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Script parsed, install not yet dispatched.
    Parsed,
    /// Install event dispatched.
    Installing,
    /// Installed and waiting for the previous worker to release its clients.
    Installed,
    /// Activate event dispatched; old stores are being swept.
    Activating,
    /// Serving fetch events.
    Activated,
    /// Replaced by a newer worker or unregistered. Terminal.
    Redundant,
}

impl WorkerState {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;

        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Parsed | Installing | Installed | Activating | Activated, Redundant)
        )
    }

    /// Only an activated worker receives fetch events.
    pub fn can_intercept_fetch(self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Redundant)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for lifecycle violations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid worker state transition: {from} -> {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },
}
