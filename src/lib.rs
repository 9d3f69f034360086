//! Machina: a declarative state machine interpreter
//!
//! Machina executes machine definitions: states with entry/exit actions,
//! guarded transitions, long-lived activities bound to state occupancy, and a
//! reactive layer of computed values and watched context fields. Definitions
//! are data; the side-effect implementations they name (guards, actions,
//! activities) are supplied separately through [`RuntimeOptions`], so the same
//! machine shape can run against different concrete effects.
//!
//! # Core Concepts
//!
//! - **State**: one named mode of the machine, with entry/exit actions,
//!   activities, tags, and a transition table
//! - **Guard**: a named or inline predicate (or boolean combinator) gating a
//!   transition
//! - **Action**: a function mutating context as a side effect of a transition
//! - **Activity**: a long-lived side effect started on state entry and
//!   disposed on exit or stop
//! - **Computed / Watch**: derived context values re-derived after every
//!   processed event, and field watchers fired on change
//!
//! # Example
//!
//! ```rust
//! use machina::{
//!     Disposer, Event, Interpreter, MachineDefinition, RuntimeOptions, StateBuilder,
//!     TransitionDef,
//! };
//! use serde_json::json;
//!
//! let definition = MachineDefinition::builder()
//!     .id("slider")
//!     .initial("idle")
//!     .context("value", 0)
//!     .context("disabled", false)
//!     .computed("isInteractive", |ctx| (!ctx.bool_field("disabled")).into())
//!     .watch("value", vec!["notifyChange".into()])
//!     .state(
//!         "idle",
//!         StateBuilder::new().on(
//!             "POINTER_DOWN",
//!             TransitionDef::to("dragging").guard("isInteractive"),
//!         ),
//!     )
//!     .state(
//!         "dragging",
//!         StateBuilder::new()
//!             .tag("active")
//!             .activity("trackPointerMove")
//!             .on("POINTER_UP", TransitionDef::to("idle"))
//!             .on(
//!                 "POINTER_MOVE",
//!                 TransitionDef::internal().action("setPointerValue"),
//!             ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let options = RuntimeOptions::new()
//!     .guard("isInteractive", |ctx, _| ctx.bool_field("isInteractive"))
//!     .action("setPointerValue", |ctx, event| {
//!         if let Some(value) = event.payload().get("value").and_then(|v| v.as_i64()) {
//!             ctx.set("value", value);
//!         }
//!     })
//!     .action("notifyChange", |_, _| { /* host change callback */ })
//!     .activity("trackPointerMove", |_, _, helpers| {
//!         // A real host would hand `helpers.sender()` to a pointer listener.
//!         let _sender = helpers.sender();
//!         Some(Disposer::new(|| { /* detach listeners */ }))
//!     });
//!
//! let interpreter = Interpreter::create(definition, options).unwrap();
//!
//! interpreter.send("POINTER_DOWN");
//! assert!(interpreter.snapshot().matches("dragging"));
//! assert!(interpreter.snapshot().has_tag("active"));
//!
//! interpreter.send(Event::with_payload("POINTER_MOVE", json!({ "value": 30 })));
//! assert_eq!(interpreter.snapshot().context.i64_field("value"), Some(30));
//!
//! interpreter.send("POINTER_UP");
//! assert!(interpreter.snapshot().matches("idle"));
//!
//! interpreter.stop();
//! ```

pub mod core;
pub mod definition;
pub mod interpreter;
pub mod options;

// Re-export commonly used types
pub use crate::core::{
    ActionFn, ActionMap, ActionRef, Context, Event, GuardExpr, GuardFn, GuardMap,
    TransitionHistory, TransitionRecord,
};
pub use crate::definition::{
    ActivityDef, ActivityRef, ComputedFn, DefinitionError, MachineBuilder, MachineDefinition,
    StateBuilder, StateNode, TransitionDef,
};
pub use crate::interpreter::{
    ActivityFn, ActivityHelpers, Disposer, EventSender, Interpreter, Snapshot, Subscription,
};
pub use crate::options::RuntimeOptions;
