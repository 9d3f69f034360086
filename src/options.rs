//! Runtime options: the named side-effect implementations a definition
//! resolves against.
//!
//! Keeping implementations separate from the definition lets the same machine
//! shape run with different concrete side effects, e.g. real pointer tracking
//! in production and recording stubs in tests.

use crate::core::action::{ActionFn, ActionMap};
use crate::core::context::Context;
use crate::core::event::Event;
use crate::core::guard::{GuardFn, GuardMap};
use crate::interpreter::activity::{ActivityFn, ActivityHelpers, ActivityMap, Disposer};
use std::fmt;
use std::sync::Arc;

/// Named guard, action, and activity implementations.
///
/// # Example
///
/// ```rust
/// use machina::RuntimeOptions;
///
/// let options = RuntimeOptions::new()
///     .guard("isInteractive", |ctx, _| !ctx.bool_field("disabled"))
///     .action("reset", |ctx, _| ctx.set("value", 0));
///
/// assert!(options.has_action("reset"));
/// assert!(!options.has_action("missing"));
/// ```
#[derive(Clone, Default)]
pub struct RuntimeOptions {
    guards: GuardMap,
    actions: ActionMap,
    activities: ActivityMap,
}

impl RuntimeOptions {
    /// Create an empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named guard predicate.
    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Context, &Event) -> bool + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Arc::new(predicate) as GuardFn);
        self
    }

    /// Register a named action.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Context, &Event) + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action) as ActionFn);
        self
    }

    /// Register a named activity start function.
    pub fn activity<F>(mut self, name: impl Into<String>, start: F) -> Self
    where
        F: Fn(&mut Context, &Event, ActivityHelpers) -> Option<Disposer> + Send + Sync + 'static,
    {
        self.activities
            .insert(name.into(), Arc::new(start) as ActivityFn);
        self
    }

    /// Whether a named action is registered.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Whether a named activity is registered.
    pub fn has_activity(&self, name: &str) -> bool {
        self.activities.contains_key(name)
    }

    pub(crate) fn guards(&self) -> &GuardMap {
        &self.guards
    }

    pub(crate) fn actions(&self) -> &ActionMap {
        &self.actions
    }

    pub(crate) fn activities(&self) -> &ActivityMap {
        &self.activities
    }
}

impl fmt::Debug for RuntimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeOptions")
            .field("guards", &self.guards.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("activities", &self.activities.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_names_are_visible() {
        let options = RuntimeOptions::new()
            .guard("isOpen", |_, _| true)
            .action("close", |_, _| {})
            .activity("track", |_, _, _| None);

        assert!(options.guards().contains_key("isOpen"));
        assert!(options.has_action("close"));
        assert!(options.has_activity("track"));
    }

    #[test]
    fn registered_guard_reads_context() {
        let options = RuntimeOptions::new().guard("isOpen", |ctx, _| ctx.bool_field("open"));

        let mut ctx = Context::new();
        ctx.set("open", true);

        let guard = options.guards().get("isOpen").unwrap();
        assert!(guard(&ctx, &Event::new("X")));
    }
}
