use crate::WatchError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopped,
    ShutDown,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherState::Idle => write!(f, "idle"),
            WatcherState::Running => write!(f, "running"),
            WatcherState::Stopped => write!(f, "stopped"),
            WatcherState::ShutDown => write!(f, "shut down"),
        }
    }
}

/// A watcher may be stopped before it ever started (retired while its start
/// request was still queued). Stop is idempotent; shutdown is accepted from
/// every state.
pub fn validate_transition(from: WatcherState, to: WatcherState) -> Result<(), WatchError> {
    let valid = matches!(
        (from, to),
        (WatcherState::Idle, WatcherState::Running)
            | (
                WatcherState::Idle | WatcherState::Running | WatcherState::Stopped,
                WatcherState::Stopped
            )
            | (_, WatcherState::ShutDown)
    );

    if valid {
        Ok(())
    } else {
        Err(WatchError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(WatcherState::Idle, WatcherState::Running).is_ok());
        assert!(validate_transition(WatcherState::Running, WatcherState::Stopped).is_ok());
        assert!(validate_transition(WatcherState::Stopped, WatcherState::Stopped).is_ok()); // idempotent stop
        assert!(validate_transition(WatcherState::Idle, WatcherState::Stopped).is_ok());
        assert!(validate_transition(WatcherState::Running, WatcherState::ShutDown).is_ok());
        assert!(validate_transition(WatcherState::ShutDown, WatcherState::ShutDown).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(WatcherState::Running, WatcherState::Running).is_err());
        assert!(validate_transition(WatcherState::Stopped, WatcherState::Running).is_err());
        assert!(validate_transition(WatcherState::ShutDown, WatcherState::Running).is_err());
        assert!(validate_transition(WatcherState::ShutDown, WatcherState::Stopped).is_err());
        assert!(validate_transition(WatcherState::Running, WatcherState::Idle).is_err());
    }
}
