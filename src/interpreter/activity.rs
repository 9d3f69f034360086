//! Long-lived side effects bound to state occupancy.
//!
//! An activity starts when its owning state is entered and is disposed when
//! that state is exited or the interpreter stops. The start function receives
//! helpers carrying a [`crate::EventSender`], the only channel by which
//! asynchronous sources (timers, pointer tracking) feed events back in.

use crate::core::context::Context;
use crate::core::event::Event;
use crate::definition::{ActivityDef, ActivityRef};
use crate::interpreter::EventSender;
use crate::options::RuntimeOptions;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared activity start function. Returns a disposer when there is cleanup
/// to perform; `None` when the activity needs no teardown.
pub type ActivityFn =
    Arc<dyn Fn(&mut Context, &Event, ActivityHelpers) -> Option<Disposer> + Send + Sync>;

/// Named activities supplied by the runtime options.
pub type ActivityMap = HashMap<String, ActivityFn>;

/// Capabilities handed to an activity when it starts.
#[derive(Clone)]
pub struct ActivityHelpers {
    sender: EventSender,
}

impl ActivityHelpers {
    pub(crate) fn new(sender: EventSender) -> Self {
        Self { sender }
    }

    /// Feed an event back into the interpreter. Events sent mid-cycle are
    /// queued and processed after the current cycle completes.
    pub fn send(&self, event: impl Into<Event>) {
        self.sender.send(event);
    }

    /// A sender the activity can move into a timer, thread, or task.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }
}

/// Idempotent cleanup handle returned by an activity start function.
///
/// The underlying cleanup runs at most once; further `dispose` calls are
/// no-ops, since exit can be reached through multiple code paths.
///
/// # Example
///
/// ```rust
/// use machina::Disposer;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counted = calls.clone();
/// let mut disposer = Disposer::new(move || {
///     counted.fetch_add(1, Ordering::SeqCst);
/// });
///
/// disposer.dispose();
/// disposer.dispose();
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct Disposer {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
    /// Wrap a cleanup function.
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Run the cleanup if it has not run yet.
    pub fn dispose(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }

    /// Whether the cleanup has already run.
    pub fn is_disposed(&self) -> bool {
        self.cleanup.is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Tracks the disposers of the currently occupied state.
#[derive(Default)]
pub(crate) struct ActivityManager {
    active: Vec<Disposer>,
}

impl ActivityManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start each activity whose guard passes, retaining returned disposers
    /// in creation order.
    pub(crate) fn start_all(
        &mut self,
        activities: &[ActivityDef],
        context: &mut Context,
        event: &Event,
        options: &RuntimeOptions,
        sender: &EventSender,
    ) {
        for def in activities {
            if let Some(guard) = &def.guard {
                if !guard.evaluate(context, event, options.guards()) {
                    tracing::trace!(event = %event.event_type(), "activity guard refused start");
                    continue;
                }
            }

            let start = match &def.activity {
                ActivityRef::Named(name) => match options.activities().get(name) {
                    Some(start) => start.clone(),
                    // Validation rejects unresolved names before dispatch.
                    None => continue,
                },
                ActivityRef::Inline(start) => start.clone(),
            };

            let helpers = ActivityHelpers::new(sender.clone());
            if let Some(disposer) = start(context, event, helpers) {
                self.active.push(disposer);
            }
            tracing::trace!(event = %event.event_type(), "activity started");
        }
    }

    /// Dispose every active handle in reverse creation order.
    pub(crate) fn stop_all(&mut self) {
        for mut disposer in self.active.drain(..).rev() {
            disposer.dispose();
            tracing::trace!("activity disposed");
        }
    }

    #[cfg(test)]
    pub(crate) fn active_count(&self) -> usize {
        self.active.len()
    }
}
