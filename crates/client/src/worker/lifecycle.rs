//! Controller lifecycle states.

use serde::Serialize;
use std::fmt;

/// Where the controller is in its install/activate cycle.
///
/// ```text
/// Uninstalled -> Installing -> Installed -> Activating -> Active
///                    |                                     |
///                    +-- (failure: back to previous)       +-- Installing (new version)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }

    /// Whether the controller may move from `self` to `next`.
    pub fn can_transition(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Uninstalled | Installed | Active, Installing)
                | (Installing, Installed)
                | (Installing, Uninstalled | Active)
                | (Installed | Active, Activating)
                | (Activating, Active)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerState::*;

    #[test]
    fn test_happy_path() {
        assert!(Uninstalled.can_transition(Installing));
        assert!(Installing.can_transition(Installed));
        assert!(Installed.can_transition(Activating));
        assert!(Activating.can_transition(Active));
        assert!(Active.can_transition(Installing));
    }

    #[test]
    fn test_failed_install_rolls_back() {
        assert!(Installing.can_transition(Uninstalled));
        assert!(Installing.can_transition(Active));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Uninstalled.can_transition(Activating));
        assert!(!Uninstalled.can_transition(Active));
        assert!(!Installing.can_transition(Activating));
        assert!(!Activating.can_transition(Installing));
        assert!(!Active.can_transition(Uninstalled));
    }
}
