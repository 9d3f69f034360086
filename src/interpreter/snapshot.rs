//! Point-in-time view of an interpreter's state.

use crate::core::context::Context;
use serde::Serialize;
use std::collections::HashSet;

/// The state name, tags, and context as of the last completed cycle.
///
/// # Example
///
/// ```rust
/// use machina::{Interpreter, MachineDefinition, RuntimeOptions, StateBuilder, TransitionDef};
///
/// let definition = MachineDefinition::builder()
///     .id("toast")
///     .initial("visible")
///     .state(
///         "visible",
///         StateBuilder::new()
///             .tag("open")
///             .on("DISMISS", TransitionDef::to("dismissed")),
///     )
///     .state("dismissed", StateBuilder::new())
///     .build()
///     .unwrap();
///
/// let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
/// let snapshot = interpreter.snapshot();
///
/// assert!(snapshot.matches("visible"));
/// assert!(snapshot.has_tag("open"));
/// assert!(!snapshot.has_tag("paused"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    /// Name of the current state.
    pub value: String,
    /// Tags of the current state.
    pub tags: HashSet<String>,
    /// Copy of the context record.
    pub context: Context,
}

impl Snapshot {
    /// Whether the current state has the given name.
    pub fn matches(&self, state: &str) -> bool {
        self.value == state
    }

    /// Whether the current state carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_compares_state_name() {
        let snapshot = Snapshot {
            value: "dragging".into(),
            tags: HashSet::new(),
            context: Context::new(),
        };

        assert!(snapshot.matches("dragging"));
        assert!(!snapshot.matches("idle"));
    }

    #[test]
    fn has_tag_checks_membership() {
        let snapshot = Snapshot {
            value: "visible".into(),
            tags: ["open".to_string()].into_iter().collect(),
            context: Context::new(),
        };

        assert!(snapshot.has_tag("open"));
        assert!(!snapshot.has_tag("closed"));
    }
}
