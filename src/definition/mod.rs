//! Machine definitions: the immutable schema an interpreter executes.
//!
//! A definition describes states, transitions, guards, actions, activities,
//! computed values, and watched fields. It carries no side-effect
//! implementations of its own; named references are resolved through
//! [`RuntimeOptions`](crate::options::RuntimeOptions) when an interpreter is
//! created, which is also when structural defects are rejected.

pub mod builder;
pub mod error;

pub use builder::{MachineBuilder, StateBuilder};
pub use error::DefinitionError;

use crate::core::action::ActionRef;
use crate::core::context::Context;
use crate::core::guard::GuardExpr;
use crate::interpreter::activity::ActivityFn;
use crate::options::RuntimeOptions;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Shared pure derivation of a computed value from context.
pub type ComputedFn = Arc<dyn Fn(&Context) -> Value + Send + Sync>;

/// A single transition rule: optional target, optional guard, ordered actions.
///
/// A transition without a target is internal: it runs its actions but never
/// exits or re-enters the current state. A transition with a target always
/// runs the full exit/entry cycle, even when the target is the current state.
///
/// # Example
///
/// ```rust
/// use machina::TransitionDef;
///
/// let external = TransitionDef::to("dragging")
///     .guard("isInteractive")
///     .action("setPointerValue");
/// assert!(!external.is_internal());
///
/// let internal = TransitionDef::internal().action("setPointerValue");
/// assert!(internal.is_internal());
/// ```
#[derive(Clone, Debug, Default)]
pub struct TransitionDef {
    /// Target state name; `None` marks an internal transition.
    pub target: Option<String>,
    /// Guard gating this transition; absent means always taken.
    pub guard: Option<GuardExpr>,
    /// Actions run when the transition is taken, in declaration order.
    pub actions: Vec<ActionRef>,
}

impl TransitionDef {
    /// A transition targeting a state.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// An internal transition: actions only, no exit/entry cycle.
    pub fn internal() -> Self {
        Self::default()
    }

    /// Gate the transition with a guard expression.
    pub fn guard(mut self, guard: impl Into<GuardExpr>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Append an action.
    pub fn action(mut self, action: impl Into<ActionRef>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Append several actions in order.
    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Whether this transition stays in the current state.
    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }
}

/// Reference to an activity: a registry name or an inline start function.
#[derive(Clone)]
pub enum ActivityRef {
    /// A name resolved through the runtime's activity map.
    Named(String),
    /// An inline start function.
    Inline(ActivityFn),
}

impl fmt::Debug for ActivityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// An activity entry on a state: the activity plus an optional guard deciding
/// whether it starts on entry.
#[derive(Clone, Debug)]
pub struct ActivityDef {
    /// The activity to start when the state is entered.
    pub activity: ActivityRef,
    /// Guard evaluated at entry; a failed guard skips the start.
    pub guard: Option<GuardExpr>,
}

impl ActivityDef {
    /// Reference a named activity.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            activity: ActivityRef::Named(name.into()),
            guard: None,
        }
    }

    /// Wrap an inline activity start function.
    pub fn inline<F>(start: F) -> Self
    where
        F: Fn(
                &mut Context,
                &crate::core::Event,
                crate::interpreter::ActivityHelpers,
            ) -> Option<crate::interpreter::Disposer>
            + Send
            + Sync
            + 'static,
    {
        Self {
            activity: ActivityRef::Inline(Arc::new(start)),
            guard: None,
        }
    }

    /// Gate the activity start with a guard expression.
    pub fn guard(mut self, guard: impl Into<GuardExpr>) -> Self {
        self.guard = Some(guard.into());
        self
    }
}

impl From<&str> for ActivityDef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

/// One named mode of the machine.
#[derive(Clone, Debug, Default)]
pub struct StateNode {
    /// Actions run on entry, in order.
    pub entry: Vec<ActionRef>,
    /// Actions run on exit, in order.
    pub exit: Vec<ActionRef>,
    /// Activities bound to occupancy of this state.
    pub activities: Vec<ActivityDef>,
    /// Labels describing the state for external consumers.
    pub tags: HashSet<String>,
    /// Transition rules per event type, in declaration order.
    pub on: HashMap<String, Vec<TransitionDef>>,
}

/// Immutable machine schema.
///
/// Constructed through [`MachineBuilder`]; executed by
/// [`Interpreter`](crate::Interpreter).
#[derive(Clone)]
pub struct MachineDefinition {
    /// Machine identifier, generated when the author supplies none.
    pub id: String,
    /// Name of the initial state.
    pub initial: String,
    /// Default context field values.
    pub context: Map<String, Value>,
    /// Computed values, re-derived after every processed event, in order.
    pub computed: Vec<(String, ComputedFn)>,
    /// Watched context fields and the actions run when they change, in order.
    pub watch: Vec<(String, Vec<ActionRef>)>,
    /// State nodes by name.
    pub states: HashMap<String, StateNode>,
}

impl MachineDefinition {
    /// Start building a definition.
    pub fn builder() -> MachineBuilder {
        MachineBuilder::new()
    }

    /// Look up a state node by name.
    pub fn state(&self, name: &str) -> Option<&StateNode> {
        self.states.get(name)
    }

    /// Reject structural defects: an unknown initial state, transitions
    /// targeting undefined states, and named actions or activities with no
    /// registered implementation. Named guards are not checked; an unresolved
    /// guard evaluates to `false` at runtime by design.
    pub(crate) fn validate(&self, options: &RuntimeOptions) -> Result<(), DefinitionError> {
        if self.states.is_empty() {
            return Err(DefinitionError::NoStates);
        }
        if !self.states.contains_key(&self.initial) {
            return Err(DefinitionError::UnknownInitialState(self.initial.clone()));
        }

        for (state_name, node) in &self.states {
            check_actions(&node.entry, options, || format!("entry of state '{state_name}'"))?;
            check_actions(&node.exit, options, || format!("exit of state '{state_name}'"))?;

            for activity in &node.activities {
                if let ActivityRef::Named(name) = &activity.activity {
                    if !options.has_activity(name) {
                        return Err(DefinitionError::UnresolvedActivity {
                            name: name.clone(),
                            state: state_name.clone(),
                        });
                    }
                }
            }

            for (event, transitions) in &node.on {
                for transition in transitions {
                    if let Some(target) = &transition.target {
                        if !self.states.contains_key(target) {
                            return Err(DefinitionError::UnknownTarget {
                                state: state_name.clone(),
                                event: event.clone(),
                                target: target.clone(),
                            });
                        }
                    }
                    check_actions(&transition.actions, options, || {
                        format!("transition on '{event}' in state '{state_name}'")
                    })?;
                }
            }
        }

        for (field, actions) in &self.watch {
            check_actions(actions, options, || format!("watch of field '{field}'"))?;
        }

        Ok(())
    }
}

impl fmt::Debug for MachineDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineDefinition")
            .field("id", &self.id)
            .field("initial", &self.initial)
            .field("context", &self.context)
            .field(
                "computed",
                &self.computed.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field(
                "watch",
                &self.watch.iter().map(|(field, _)| field).collect::<Vec<_>>(),
            )
            .field("states", &self.states)
            .finish()
    }
}

fn check_actions(
    refs: &[ActionRef],
    options: &RuntimeOptions,
    site: impl Fn() -> String,
) -> Result<(), DefinitionError> {
    for action_ref in refs {
        if let ActionRef::Named(name) = action_ref {
            if !options.has_action(name) {
                return Err(DefinitionError::UnresolvedAction {
                    name: name.clone(),
                    site: site(),
                });
            }
        }
    }
    Ok(())
}
