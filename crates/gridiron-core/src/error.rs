//! Error types for the state machine runtime.
//!
//! Three families: protocol violations (defects in a state
//! implementation), state construction failures, and engine-surface
//! errors. Lookup failures carry the offending name. Recoverable
//! absences (no handler for an event, unresolved player, missing
//! before-snapshot) are not errors and never appear here.

use std::error::Error;
use std::fmt;

/// Which kind of callback a context was built for.
///
/// Controls whether the context permits recording a transition:
/// construction and disposal disallow it, `run` and event handlers
/// allow it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextPhase {
    /// A state constructor.
    Construct,
    /// The per-tick `run` callback.
    Run,
    /// A non-tick event handler (chat, command, join, leave).
    Event,
    /// A disposal callback.
    Dispose,
}

impl ContextPhase {
    /// Whether a transition may be recorded from this phase.
    pub fn allows_transition(self) -> bool {
        matches!(self, ContextPhase::Run | ContextPhase::Event)
    }
}

impl fmt::Display for ContextPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construct => write!(f, "construction"),
            Self::Run => write!(f, "run"),
            Self::Event => write!(f, "event handling"),
            Self::Dispose => write!(f, "disposal"),
        }
    }
}

/// Defects in a state implementation, fatal to the current operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A second transition was recorded within one context.
    DoubleTransition {
        /// Name of the offending state.
        state: String,
    },
    /// A transition was recorded from a phase that disallows it.
    TransitionNotAllowed {
        /// Name of the offending state.
        state: String,
        /// The phase the context was built for.
        phase: ContextPhase,
    },
    /// A callback unwound with an interrupt but no transition was
    /// recorded and no hook failed.
    StrayInterrupt {
        /// Name of the offending state.
        state: String,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleTransition { state } => {
                write!(f, "state '{state}' recorded a second transition in one context")
            }
            Self::TransitionNotAllowed { state, phase } => {
                write!(f, "state '{state}' recorded a transition during {phase}")
            }
            Self::StrayInterrupt { state } => {
                write!(f, "state '{state}' unwound without recording a transition")
            }
        }
    }
}

impl Error for ProtocolError {}

/// Errors from a state constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// The constructor rejected its parameters or failed to build.
    ConstructFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstructFailed { reason } => write!(f, "construction failed: {reason}"),
        }
    }
}

impl Error for StateError {}

/// Errors surfaced by the engine's entry points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// A state implementation violated the context protocol.
    Protocol(ProtocolError),
    /// A transition or `start` named a state missing from the registry.
    UnknownState {
        /// The unregistered name.
        name: String,
    },
    /// A `restore` request matched no recorded checkpoint.
    MissingCheckpoint {
        /// The requested key, if any.
        key: Option<String>,
    },
    /// A state constructor failed.
    State {
        /// Name of the failing state.
        name: String,
        /// The underlying constructor error.
        source: StateError,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol violation: {e}"),
            Self::UnknownState { name } => write!(f, "unknown state '{name}'"),
            Self::MissingCheckpoint { key: Some(key) } => {
                write!(f, "no checkpoint recorded for key '{key}'")
            }
            Self::MissingCheckpoint { key: None } => {
                write!(f, "no checkpoint recorded")
            }
            Self::State { name, source } => write!(f, "state '{name}': {source}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            Self::State { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ProtocolError> for EngineError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_transition_permissions() {
        assert!(ContextPhase::Run.allows_transition());
        assert!(ContextPhase::Event.allows_transition());
        assert!(!ContextPhase::Construct.allows_transition());
        assert!(!ContextPhase::Dispose.allows_transition());
    }

    #[test]
    fn display_carries_offending_name() {
        let err = EngineError::UnknownState {
            name: "punt".to_string(),
        };
        assert!(err.to_string().contains("punt"));

        let err = EngineError::MissingCheckpoint {
            key: Some("pre-snap".to_string()),
        };
        assert!(err.to_string().contains("pre-snap"));
    }

    #[test]
    fn protocol_error_nests_as_source() {
        let err = EngineError::from(ProtocolError::DoubleTransition {
            state: "kickoff".to_string(),
        });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("kickoff"));
    }
}
