//! Guard expressions gating transitions.
//!
//! A guard is a named predicate, an inline predicate, or a boolean combinator
//! over other guards. Guards are evaluated against the current context and the
//! event under consideration; they must be side-effect-free.

use super::context::Context;
use super::event::Event;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared predicate invoked with the current context and event.
pub type GuardFn = Arc<dyn Fn(&Context, &Event) -> bool + Send + Sync>;

/// Named predicates supplied by the runtime options.
pub type GuardMap = HashMap<String, GuardFn>;

/// A guard expression.
///
/// `Named` guards resolve through the runtime's guard map; a name with no
/// registered predicate evaluates to `false`, so a transition guarded by an
/// unresolved name is simply never taken. `All` and `Any` evaluate every
/// operand in declaration order with no short-circuit, which is why operand
/// predicates must be side-effect-free.
///
/// # Example
///
/// ```rust
/// use machina::{Context, Event, GuardExpr};
/// use std::collections::HashMap;
///
/// let expr = GuardExpr::any(vec![
///     "isHorizontal".into(),
///     GuardExpr::predicate(|ctx, _| ctx.bool_field("focused")),
/// ]);
///
/// let mut ctx = Context::new();
/// ctx.set("focused", true);
///
/// assert!(expr.evaluate(&ctx, &Event::new("ARROW_LEFT"), &HashMap::new()));
/// ```
#[derive(Clone)]
pub enum GuardExpr {
    /// A name resolved through the runtime's guard map.
    Named(String),
    /// An inline predicate.
    Predicate(GuardFn),
    /// True only if every operand is true.
    All(Vec<GuardExpr>),
    /// True if at least one operand is true.
    Any(Vec<GuardExpr>),
    /// Negation of a single operand.
    Not(Box<GuardExpr>),
}

impl GuardExpr {
    /// Reference a named guard.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wrap an inline predicate.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Context, &Event) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Conjunction of operands.
    pub fn all(operands: Vec<GuardExpr>) -> Self {
        Self::All(operands)
    }

    /// Disjunction of operands.
    pub fn any(operands: Vec<GuardExpr>) -> Self {
        Self::Any(operands)
    }

    /// Negation of an operand.
    pub fn not(operand: GuardExpr) -> Self {
        Self::Not(Box::new(operand))
    }

    /// Evaluate the expression against a context and event.
    ///
    /// Combinator operands are always evaluated in full before the results
    /// are combined; this is observable behavior, not an optimization detail.
    pub fn evaluate(&self, context: &Context, event: &Event, guards: &GuardMap) -> bool {
        match self {
            Self::Named(name) => match guards.get(name) {
                Some(predicate) => predicate(context, event),
                None => {
                    tracing::trace!(guard = %name, "unresolved guard evaluates to false");
                    false
                }
            },
            Self::Predicate(predicate) => predicate(context, event),
            Self::All(operands) => {
                let results: Vec<bool> = operands
                    .iter()
                    .map(|operand| operand.evaluate(context, event, guards))
                    .collect();
                results.into_iter().all(|passed| passed)
            }
            Self::Any(operands) => {
                let results: Vec<bool> = operands
                    .iter()
                    .map(|operand| operand.evaluate(context, event, guards))
                    .collect();
                results.into_iter().any(|passed| passed)
            }
            Self::Not(operand) => !operand.evaluate(context, event, guards),
        }
    }
}

impl From<&str> for GuardExpr {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for GuardExpr {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl fmt::Debug for GuardExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::All(operands) => f.debug_tuple("All").field(operands).finish(),
            Self::Any(operands) => f.debug_tuple("Any").field(operands).finish(),
            Self::Not(operand) => f.debug_tuple("Not").field(operand).finish(),
        }
    }
}
