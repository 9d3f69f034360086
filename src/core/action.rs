//! Action references and the dispatcher that runs them.
//!
//! Actions are the only place context mutation happens. A reference is either
//! a name resolved through the runtime's action map or an inline function;
//! named references are checked at machine construction, so dispatch never
//! fails.

use super::context::Context;
use super::event::Event;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared action function mutating context in response to an event.
pub type ActionFn = Arc<dyn Fn(&mut Context, &Event) + Send + Sync>;

/// Named actions supplied by the runtime options.
pub type ActionMap = HashMap<String, ActionFn>;

/// Reference to an action: a registry name or an inline function.
#[derive(Clone)]
pub enum ActionRef {
    /// A name resolved through the runtime's action map.
    Named(String),
    /// An inline action function.
    Inline(ActionFn),
}

impl ActionRef {
    /// Reference a named action.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wrap an inline action.
    pub fn inline<F>(action: F) -> Self
    where
        F: Fn(&mut Context, &Event) + Send + Sync + 'static,
    {
        Self::Inline(Arc::new(action))
    }
}

impl From<&str> for ActionRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ActionRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl fmt::Debug for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// Run a list of actions strictly in declaration order.
///
/// Named references missing from the map are skipped; construction-time
/// validation rejects them before an interpreter ever dispatches.
pub(crate) fn run_actions(
    refs: &[ActionRef],
    context: &mut Context,
    event: &Event,
    actions: &ActionMap,
) {
    for action_ref in refs {
        match action_ref {
            ActionRef::Named(name) => {
                if let Some(action) = actions.get(name) {
                    action(context, event);
                }
            }
            ActionRef::Inline(action) => action(context, event),
        }
    }
}
