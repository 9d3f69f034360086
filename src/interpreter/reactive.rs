//! Reactive context layer: computed values and watched fields.
//!
//! Computed values are re-derived in full once per processed event, never
//! incrementally. Watchers compare a field's pre-cycle value against its
//! post-cycle value and fire at most once per event, regardless of how many
//! actions touched the field in between.

use crate::core::action::{self, ActionMap, ActionRef};
use crate::core::context::Context;
use crate::core::event::Event;
use crate::definition::ComputedFn;
use serde_json::Value;

/// Re-derive every computed value and write it into the context under its own
/// name. Derivations run in declaration order, so later ones see earlier
/// results.
pub(crate) fn recompute(computed: &[(String, ComputedFn)], context: &mut Context) {
    for (name, derive) in computed {
        let value = derive(context);
        context.set(name.clone(), value);
    }
}

/// Snapshot the current values of all watched fields, by declaration index.
pub(crate) fn watch_snapshot(
    watch: &[(String, Vec<ActionRef>)],
    context: &Context,
) -> Vec<Option<Value>> {
    watch
        .iter()
        .map(|(field, _)| context.get(field).cloned())
        .collect()
}

/// Fire watch actions for every field whose value changed since the pre-cycle
/// snapshot, in watch declaration order.
pub(crate) fn fire_watchers(
    watch: &[(String, Vec<ActionRef>)],
    before: &[Option<Value>],
    context: &mut Context,
    event: &Event,
    actions: &ActionMap,
) {
    for (index, (field, watch_actions)) in watch.iter().enumerate() {
        let current = context.get(field).cloned();
        if current != before[index] {
            tracing::trace!(field = %field, "watched field changed");
            action::run_actions(watch_actions, context, event, actions);
        }
    }
}
