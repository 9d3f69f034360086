//! Fluent builders for machine definitions.

use super::error::DefinitionError;
use super::{ActivityDef, MachineDefinition, StateNode, TransitionDef};
use crate::core::action::ActionRef;
use crate::core::context::Context;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Builder for a [`MachineDefinition`].
///
/// # Example
///
/// ```rust
/// use machina::{MachineDefinition, StateBuilder, TransitionDef};
///
/// let definition = MachineDefinition::builder()
///     .id("slider")
///     .initial("idle")
///     .context("value", 0)
///     .context("disabled", false)
///     .computed("isInteractive", |ctx| (!ctx.bool_field("disabled")).into())
///     .state(
///         "idle",
///         StateBuilder::new().on(
///             "POINTER_DOWN",
///             TransitionDef::to("dragging").guard("isInteractive"),
///         ),
///     )
///     .state(
///         "dragging",
///         StateBuilder::new()
///             .tag("active")
///             .on("POINTER_UP", TransitionDef::to("idle")),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.initial, "idle");
/// assert_eq!(definition.states.len(), 2);
/// ```
pub struct MachineBuilder {
    id: Option<String>,
    initial: Option<String>,
    context: Map<String, Value>,
    computed: Vec<(String, super::ComputedFn)>,
    watch: Vec<(String, Vec<ActionRef>)>,
    states: Vec<(String, StateNode)>,
}

impl MachineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            id: None,
            initial: None,
            context: Map::new(),
            computed: Vec::new(),
            watch: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Set the machine id. A v4 UUID is generated when omitted.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the initial state name (required).
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    /// Add a context field default.
    pub fn context(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(field.into(), value.into());
        self
    }

    /// Add a computed value. Derivations run in declaration order after every
    /// processed event; later derivations see earlier results.
    pub fn computed<F>(mut self, name: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&Context) -> Value + Send + Sync + 'static,
    {
        self.computed.push((name.into(), Arc::new(derive)));
        self
    }

    /// Watch a context field, running the given actions when its value changes
    /// across a processed event.
    pub fn watch(mut self, field: impl Into<String>, actions: Vec<ActionRef>) -> Self {
        self.watch.push((field.into(), actions));
        self
    }

    /// Add a state.
    pub fn state(mut self, name: impl Into<String>, state: StateBuilder) -> Self {
        self.states.push((name.into(), state.build()));
        self
    }

    /// Build the definition. Fails on missing required fields and duplicate
    /// state names; cross-references are checked later against the runtime
    /// options when an interpreter is created.
    pub fn build(self) -> Result<MachineDefinition, DefinitionError> {
        let initial = self.initial.ok_or(DefinitionError::MissingInitialState)?;
        if self.states.is_empty() {
            return Err(DefinitionError::NoStates);
        }

        let mut states = HashMap::with_capacity(self.states.len());
        for (name, node) in self.states {
            if states.insert(name.clone(), node).is_some() {
                return Err(DefinitionError::DuplicateState(name));
            }
        }

        Ok(MachineDefinition {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            initial,
            context: self.context,
            computed: self.computed,
            watch: self.watch,
            states,
        })
    }
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a [`StateNode`].
pub struct StateBuilder {
    node: StateNode,
}

impl StateBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            node: StateNode::default(),
        }
    }

    /// Append an entry action.
    pub fn entry(mut self, action: impl Into<ActionRef>) -> Self {
        self.node.entry.push(action.into());
        self
    }

    /// Append an exit action.
    pub fn exit(mut self, action: impl Into<ActionRef>) -> Self {
        self.node.exit.push(action.into());
        self
    }

    /// Append an activity bound to occupancy of this state.
    pub fn activity(mut self, activity: impl Into<ActivityDef>) -> Self {
        self.node.activities.push(activity.into());
        self
    }

    /// Attach a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.node.tags.insert(tag.into());
        self
    }

    /// Append a transition rule for an event type. Repeated calls with the
    /// same event type accumulate candidates in declaration order; the first
    /// whose guard passes wins.
    pub fn on(mut self, event: impl Into<String>, transition: TransitionDef) -> Self {
        self.node.on.entry(event.into()).or_default().push(transition);
        self
    }

    fn build(self) -> StateNode {
        self.node
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
