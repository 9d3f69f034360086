//! Construction and validation errors for machine definitions.

use thiserror::Error;

/// Errors raised while building or validating a machine definition.
///
/// These are structural configuration defects, reported before an interpreter
/// processes any event. Runtime data issues (unknown event types, unresolved
/// guard names) are deliberately not errors.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No states defined. Add at least one state")]
    NoStates,

    #[error("State '{0}' is defined more than once")]
    DuplicateState(String),

    #[error("Initial state '{0}' is not a defined state")]
    UnknownInitialState(String),

    #[error("Transition on '{event}' in state '{state}' targets unknown state '{target}'")]
    UnknownTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("Action '{name}' referenced by {site} is not registered")]
    UnresolvedAction { name: String, site: String },

    #[error("Activity '{name}' referenced by state '{state}' is not registered")]
    UnresolvedActivity { name: String, state: String },
}
