//! Worker lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one cache proxy generation.
///
/// `Parsed → Installing → Installed → Activating → Activated`, and
/// `Redundant` once superseded or after a failed activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    /// Whether the worker may handle fetch events.
    pub fn can_intercept(&self) -> bool {
        matches!(self, WorkerState::Activating | WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_intercept() {
        assert!(WorkerState::Activated.can_intercept());
        assert!(WorkerState::Activating.can_intercept());
        assert!(!WorkerState::Installed.can_intercept());
        assert!(!WorkerState::Redundant.can_intercept());
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&WorkerState::Activated).unwrap(), "\"activated\"");
    }
}
