//! The interpreter: holds current state and context, processes one event at a
//! time, and orchestrates guards, actions, activities, and the reactive layer.
//!
//! Event processing is strictly serialized. A `send` that arrives while a
//! cycle is running (from a subscriber, an activity callback, or another
//! thread) is queued and processed after the current cycle completes, in
//! submission order. Context is owned by exactly one interpreter and touched
//! by exactly one cycle at a time.

pub mod activity;
pub(crate) mod reactive;
pub mod snapshot;

pub use activity::{ActivityFn, ActivityHelpers, ActivityMap, Disposer};
pub use snapshot::Snapshot;

use crate::core::action;
use crate::core::context::Context;
use crate::core::event::Event;
use crate::core::history::{TransitionHistory, TransitionRecord};
use crate::definition::{DefinitionError, MachineDefinition};
use crate::options::RuntimeOptions;
use activity::ActivityManager;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Mutable machine state, touched by one cycle at a time.
struct MachineState {
    state: String,
    context: Context,
    activities: ActivityManager,
    history: TransitionHistory,
}

struct Inner {
    definition: MachineDefinition,
    options: RuntimeOptions,
    machine: Mutex<MachineState>,
    queue: Mutex<VecDeque<Event>>,
    processing: AtomicBool,
    stopped: AtomicBool,
    subscribers: Mutex<Vec<(u64, Listener)>>,
    next_subscriber_id: AtomicU64,
}

/// A running machine service.
///
/// Cloning yields another handle to the same service; there is exactly one
/// current state and one context behind all handles.
///
/// # Example
///
/// ```rust
/// use machina::{Interpreter, MachineDefinition, RuntimeOptions, StateBuilder, TransitionDef};
///
/// let definition = MachineDefinition::builder()
///     .id("switch")
///     .initial("off")
///     .state("off", StateBuilder::new().on("TOGGLE", TransitionDef::to("on")))
///     .state("on", StateBuilder::new().on("TOGGLE", TransitionDef::to("off")))
///     .build()
///     .unwrap();
///
/// let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
/// interpreter.send("TOGGLE");
/// assert!(interpreter.snapshot().matches("on"));
///
/// interpreter.send("TOGGLE");
/// assert!(interpreter.snapshot().matches("off"));
/// ```
#[derive(Clone)]
pub struct Interpreter {
    inner: Arc<Inner>,
}

impl Interpreter {
    /// Validate a definition against runtime options and start interpreting.
    ///
    /// The context is initialized from the definition's defaults, computed
    /// values are derived, and the initial state is entered: its entry
    /// actions run and its activities start under the reserved
    /// [`INIT_EVENT`](crate::core::INIT_EVENT).
    pub fn create(
        definition: MachineDefinition,
        options: RuntimeOptions,
    ) -> Result<Self, DefinitionError> {
        definition.validate(&options)?;

        let context = Context::from_map(definition.context.clone());
        let initial = definition.initial.clone();
        let inner = Arc::new(Inner {
            definition,
            options,
            machine: Mutex::new(MachineState {
                state: initial,
                context,
                activities: ActivityManager::new(),
                history: TransitionHistory::new(),
            }),
            queue: Mutex::new(VecDeque::new()),
            // Held through initial entry so a synchronous activity send
            // queues instead of starting a nested drain.
            processing: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber_id: AtomicU64::new(0),
        });

        {
            let sender = EventSender {
                inner: Arc::downgrade(&inner),
            };
            let def = &inner.definition;
            let mut machine = inner.machine.lock();
            let init = Event::init();

            reactive::recompute(&def.computed, &mut machine.context);
            if let Some(node) = def.states.get(&machine.state) {
                action::run_actions(&node.entry, &mut machine.context, &init, inner.options.actions());
                let MachineState {
                    context, activities, ..
                } = &mut *machine;
                activities.start_all(&node.activities, context, &init, &inner.options, &sender);
            }
            reactive::recompute(&def.computed, &mut machine.context);
            tracing::debug!(machine = %def.id, initial = %machine.state, "interpreter started");
        }
        Inner::drain(&inner);

        Ok(Self { inner })
    }

    /// The machine id from the definition.
    pub fn id(&self) -> &str {
        &self.inner.definition.id
    }

    /// Send an event. Bare strings are sugar for payload-less events.
    ///
    /// Processing is serialized: if a cycle is already running, the event is
    /// queued and handled afterwards. After [`stop`](Self::stop) this is a
    /// no-op.
    pub fn send(&self, event: impl Into<Event>) {
        Inner::send_event(&self.inner, event.into());
    }

    /// A cheap, cloneable handle for feeding events in from elsewhere
    /// (timers, threads, async tasks). Becomes a no-op once every interpreter
    /// handle is dropped or the interpreter is stopped.
    pub fn sender(&self) -> EventSender {
        EventSender {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register a listener, invoked immediately with the current snapshot and
    /// then after every processed event.
    ///
    /// The listener stays registered until [`Subscription::unsubscribe`] is
    /// called; dropping the subscription handle does not detach it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(listener);
        self.inner.subscribers.lock().push((id, listener.clone()));

        listener(&self.snapshot());

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// The current state name, tags, and a copy of the context.
    pub fn snapshot(&self) -> Snapshot {
        let machine = self.inner.machine.lock();
        self.inner.build_snapshot(&machine)
    }

    /// The external transitions taken so far.
    pub fn history(&self) -> TransitionHistory {
        self.inner.machine.lock().history.clone()
    }

    /// Dispose all active activities and make the interpreter inert. Further
    /// `send` calls are no-ops. Idempotent.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.queue.lock().clear();
        self.inner.machine.lock().activities.stop_all();
        tracing::debug!(machine = %self.inner.definition.id, "interpreter stopped");
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("id", &self.inner.definition.id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Inner {
    fn send_event(inner: &Arc<Inner>, event: Event) {
        if inner.stopped.load(Ordering::Acquire) {
            tracing::trace!(event = %event.event_type(), "event ignored after stop");
            return;
        }
        inner.queue.lock().push_back(event);
        if inner.processing.swap(true, Ordering::AcqRel) {
            return;
        }
        Inner::drain(inner);
    }

    fn drain(inner: &Arc<Inner>) {
        // A panic from user guard/action/activity code propagates to the
        // caller of `send`; the flag must not stay held or the interpreter
        // could never drain again.
        struct ClearOnPanic<'a>(&'a AtomicBool);
        impl Drop for ClearOnPanic<'_> {
            fn drop(&mut self) {
                if std::thread::panicking() {
                    self.0.store(false, Ordering::Release);
                }
            }
        }
        let _unwind_guard = ClearOnPanic(&inner.processing);

        let sender = EventSender {
            inner: Arc::downgrade(inner),
        };
        loop {
            while !inner.stopped.load(Ordering::Acquire) {
                let next = inner.queue.lock().pop_front();
                match next {
                    Some(event) => inner.process_event(event, &sender),
                    None => break,
                }
            }
            if inner.stopped.load(Ordering::Acquire) {
                inner.queue.lock().clear();
                inner.machine.lock().activities.stop_all();
            }
            inner.processing.store(false, Ordering::Release);
            // An event may have been queued between the empty check and the
            // flag release; reclaim the flag and keep draining if so.
            if inner.stopped.load(Ordering::Acquire) || inner.queue.lock().is_empty() {
                return;
            }
            if inner.processing.swap(true, Ordering::AcqRel) {
                return;
            }
        }
    }

    /// One transition cycle: selection, actions, activity lifecycle, reactive
    /// pass, notification.
    fn process_event(&self, event: Event, sender: &EventSender) {
        let def = &self.definition;
        let mut machine = self.machine.lock();

        let state_name = machine.state.clone();
        let Some(state_node) = def.states.get(&state_name) else {
            return;
        };
        let Some(candidates) = state_node.on.get(event.event_type()) else {
            tracing::trace!(state = %state_name, event = %event.event_type(), "no transition for event");
            return;
        };

        // First candidate whose guard passes, in declaration order.
        let selected = candidates.iter().find(|candidate| {
            candidate
                .guard
                .as_ref()
                .map_or(true, |guard| guard.evaluate(&machine.context, &event, self.options.guards()))
        });
        let Some(transition) = selected else {
            tracing::trace!(state = %state_name, event = %event.event_type(), "no guard passed");
            return;
        };

        let watch_before = reactive::watch_snapshot(&def.watch, &machine.context);

        if transition.target.is_some() {
            action::run_actions(&state_node.exit, &mut machine.context, &event, self.options.actions());
            machine.activities.stop_all();
        }

        action::run_actions(&transition.actions, &mut machine.context, &event, self.options.actions());

        if let Some(target) = &transition.target {
            let from = std::mem::replace(&mut machine.state, target.clone());
            machine.history = machine.history.record(TransitionRecord {
                from: from.clone(),
                to: target.clone(),
                event_type: event.event_type().to_string(),
                timestamp: Utc::now(),
            });
            tracing::debug!(machine = %def.id, %from, to = %target, event = %event.event_type(), "transition");

            if let Some(next_node) = def.states.get(target) {
                action::run_actions(&next_node.entry, &mut machine.context, &event, self.options.actions());
                let MachineState {
                    context, activities, ..
                } = &mut *machine;
                activities.start_all(&next_node.activities, context, &event, &self.options, sender);
            }
        }

        reactive::recompute(&def.computed, &mut machine.context);
        reactive::fire_watchers(
            &def.watch,
            &watch_before,
            &mut machine.context,
            &event,
            self.options.actions(),
        );

        let snapshot = self.build_snapshot(&machine);
        drop(machine);
        self.notify(&snapshot);
    }

    fn build_snapshot(&self, machine: &MachineState) -> Snapshot {
        let tags = self
            .definition
            .states
            .get(&machine.state)
            .map(|node| node.tags.clone())
            .unwrap_or_default();
        Snapshot {
            value: machine.state.clone(),
            tags,
            context: machine.context.clone(),
        }
    }

    fn notify(&self, snapshot: &Snapshot) {
        let listeners: Vec<Listener> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

/// Cloneable, `Send` handle feeding events into an interpreter's queue.
///
/// This is the channel activities use (via
/// [`ActivityHelpers::send`]) and the only way external asynchronous sources
/// report back in.
#[derive(Clone)]
pub struct EventSender {
    inner: Weak<Inner>,
}

impl EventSender {
    /// Queue an event for processing. No-op when the interpreter has been
    /// stopped or dropped.
    pub fn send(&self, event: impl Into<Event>) {
        match self.inner.upgrade() {
            Some(inner) => Inner::send_event(&inner, event.into()),
            None => tracing::trace!("event sender target no longer exists"),
        }
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self { inner: Weak::new() }
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventSender")
    }
}

/// Handle detaching a listener registered with [`Interpreter::subscribe`].
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Detach the listener.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ActivityDef, StateBuilder, TransitionDef};
    use std::sync::atomic::AtomicUsize;

    fn toggle_definition() -> MachineDefinition {
        MachineDefinition::builder()
            .id("toggle")
            .initial("off")
            .state("off", StateBuilder::new().on("TOGGLE", TransitionDef::to("on")))
            .state("on", StateBuilder::new().on("TOGGLE", TransitionDef::to("off")))
            .build()
            .unwrap()
    }

    #[test]
    fn initial_snapshot_reflects_defaults_and_computed() {
        let definition = MachineDefinition::builder()
            .id("slider")
            .initial("idle")
            .context("disabled", true)
            .computed("isInteractive", |ctx| (!ctx.bool_field("disabled")).into())
            .state("idle", StateBuilder::new())
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        let snapshot = interpreter.snapshot();

        assert!(snapshot.matches("idle"));
        assert!(snapshot.context.bool_field("disabled"));
        assert!(!snapshot.context.bool_field("isInteractive"));
    }

    #[test]
    fn entry_actions_of_initial_state_run_under_init_event() {
        let definition = MachineDefinition::builder()
            .id("test")
            .initial("idle")
            .state(
                "idle",
                StateBuilder::new().entry(crate::ActionRef::inline(|ctx, event| {
                    ctx.set("enteredBy", event.event_type());
                })),
            )
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        assert_eq!(
            interpreter.snapshot().context.str_field("enteredBy"),
            Some(crate::core::INIT_EVENT)
        );
    }

    #[test]
    fn send_moves_between_states() {
        let interpreter = Interpreter::create(toggle_definition(), RuntimeOptions::new()).unwrap();

        interpreter.send("TOGGLE");
        assert!(interpreter.snapshot().matches("on"));

        interpreter.send("TOGGLE");
        assert!(interpreter.snapshot().matches("off"));
    }

    #[test]
    fn unknown_event_is_a_silent_no_op() {
        let interpreter = Interpreter::create(toggle_definition(), RuntimeOptions::new()).unwrap();
        let before = interpreter.snapshot();

        interpreter.send("UNRELATED");

        assert_eq!(interpreter.snapshot(), before);
    }

    #[test]
    fn no_op_event_does_not_notify_subscribers() {
        let interpreter = Interpreter::create(toggle_definition(), RuntimeOptions::new()).unwrap();

        let notifications = Arc::new(AtomicUsize::new(0));
        let counted = notifications.clone();
        interpreter.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        // Immediate call on subscribe.
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        interpreter.send("UNRELATED");
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        interpreter.send("TOGGLE");
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_passing_guard_in_declaration_order_wins() {
        let definition = MachineDefinition::builder()
            .id("test")
            .initial("a")
            .state(
                "a",
                StateBuilder::new()
                    .on("GO", TransitionDef::to("b").guard("closed"))
                    .on("GO", TransitionDef::to("c"))
                    .on("GO", TransitionDef::to("d")),
            )
            .state("b", StateBuilder::new())
            .state("c", StateBuilder::new())
            .state("d", StateBuilder::new())
            .build()
            .unwrap();

        let options = RuntimeOptions::new().guard("closed", |_, _| false);
        let interpreter = Interpreter::create(definition, options).unwrap();

        interpreter.send("GO");
        assert!(interpreter.snapshot().matches("c"));
    }

    #[test]
    fn guarded_transition_is_skipped_when_guard_fails() {
        let definition = MachineDefinition::builder()
            .id("slider")
            .initial("idle")
            .context("disabled", true)
            .state(
                "idle",
                StateBuilder::new().on(
                    "POINTER_DOWN",
                    TransitionDef::to("dragging").guard("isInteractive"),
                ),
            )
            .state("dragging", StateBuilder::new())
            .build()
            .unwrap();

        let options =
            RuntimeOptions::new().guard("isInteractive", |ctx, _| !ctx.bool_field("disabled"));
        let interpreter = Interpreter::create(definition, options).unwrap();

        interpreter.send("POINTER_DOWN");
        assert!(interpreter.snapshot().matches("idle"));
    }

    #[test]
    fn exit_transition_entry_actions_run_in_order() {
        let trace = |label: &'static str| {
            crate::ActionRef::inline(move |ctx: &mut Context, _: &Event| {
                let so_far = ctx.str_field("trace").unwrap_or("").to_string();
                ctx.set("trace", format!("{so_far}{label}"));
            })
        };

        let definition = MachineDefinition::builder()
            .id("test")
            .initial("a")
            .state(
                "a",
                StateBuilder::new()
                    .exit(trace("x"))
                    .on("GO", TransitionDef::to("b").action(trace("t"))),
            )
            .state("b", StateBuilder::new().entry(trace("e")))
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        interpreter.send("GO");

        assert_eq!(interpreter.snapshot().context.str_field("trace"), Some("xte"));
    }

    #[test]
    fn internal_transition_runs_only_its_own_actions() {
        let definition = MachineDefinition::builder()
            .id("test")
            .initial("focus")
            .context("value", 0)
            .state(
                "focus",
                StateBuilder::new()
                    .entry(crate::ActionRef::inline(|ctx, _| {
                        let entries = ctx.i64_field("entries").unwrap_or(0);
                        ctx.set("entries", entries + 1);
                    }))
                    .on(
                        "INCREMENT",
                        TransitionDef::internal().action(crate::ActionRef::inline(|ctx, _| {
                            let value = ctx.i64_field("value").unwrap_or(0);
                            ctx.set("value", value + 1);
                        })),
                    ),
            )
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        interpreter.send("INCREMENT");
        interpreter.send("INCREMENT");

        let snapshot = interpreter.snapshot();
        assert_eq!(snapshot.context.i64_field("value"), Some(2));
        // Entry ran once, at interpreter start.
        assert_eq!(snapshot.context.i64_field("entries"), Some(1));
    }

    #[test]
    fn self_transition_restarts_activities() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let start_count = starts.clone();
        let stop_count = stops.clone();
        let definition = MachineDefinition::builder()
            .id("test")
            .initial("active")
            .state(
                "active",
                StateBuilder::new()
                    .activity(ActivityDef::inline(move |_, _, _| {
                        start_count.fetch_add(1, Ordering::SeqCst);
                        let stop_count = stop_count.clone();
                        Some(Disposer::new(move || {
                            stop_count.fetch_add(1, Ordering::SeqCst);
                        }))
                    }))
                    .on("RESET", TransitionDef::to("active")),
            )
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        interpreter.send("RESET");
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stop_disposes_active_activities_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let stop_count = stops.clone();

        let definition = MachineDefinition::builder()
            .id("test")
            .initial("active")
            .state(
                "active",
                StateBuilder::new().activity(ActivityDef::inline(move |_, _, _| {
                    let stop_count = stop_count.clone();
                    Some(Disposer::new(move || {
                        stop_count.fetch_add(1, Ordering::SeqCst);
                    }))
                })),
            )
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        interpreter.stop();
        interpreter.stop();

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(interpreter.is_stopped());
    }

    #[test]
    fn send_after_stop_is_a_no_op() {
        let interpreter = Interpreter::create(toggle_definition(), RuntimeOptions::new()).unwrap();
        interpreter.stop();

        interpreter.send("TOGGLE");
        assert!(interpreter.snapshot().matches("off"));
    }

    #[test]
    fn unsubscribe_detaches_listener() {
        let interpreter = Interpreter::create(toggle_definition(), RuntimeOptions::new()).unwrap();

        let notifications = Arc::new(AtomicUsize::new(0));
        let counted = notifications.clone();
        let subscription = interpreter.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        interpreter.send("TOGGLE");

        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_sent_mid_cycle_are_processed_in_order_afterwards() {
        // The activity sends two events synchronously while its own start
        // cycle is still running; both must be queued and processed in
        // submission order once the cycle completes.
        let definition = MachineDefinition::builder()
            .id("test")
            .initial("idle")
            .state(
                "idle",
                StateBuilder::new().on("BEGIN", TransitionDef::to("working")),
            )
            .state(
                "working",
                StateBuilder::new()
                    .activity(ActivityDef::inline(|_, _, helpers| {
                        helpers.send("STEP");
                        helpers.send("FINISH");
                        None
                    }))
                    .on(
                        "STEP",
                        TransitionDef::internal().action(crate::ActionRef::inline(|ctx, _| {
                            ctx.set("stepped", true);
                        })),
                    )
                    .on("FINISH", TransitionDef::to("done")),
            )
            .state("done", StateBuilder::new())
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        interpreter.send("BEGIN");

        let snapshot = interpreter.snapshot();
        assert!(snapshot.matches("done"));
        assert!(snapshot.context.bool_field("stepped"));
    }

    #[test]
    fn history_records_external_transitions_only() {
        let definition = MachineDefinition::builder()
            .id("test")
            .initial("a")
            .state(
                "a",
                StateBuilder::new()
                    .on("NUDGE", TransitionDef::internal())
                    .on("GO", TransitionDef::to("b")),
            )
            .state("b", StateBuilder::new().on("BACK", TransitionDef::to("a")))
            .build()
            .unwrap();

        let interpreter = Interpreter::create(definition, RuntimeOptions::new()).unwrap();
        interpreter.send("NUDGE");
        interpreter.send("GO");
        interpreter.send("BACK");

        let history = interpreter.history();
        assert_eq!(history.path(), vec!["a", "b", "a"]);
        assert_eq!(history.records()[0].event_type, "GO");
    }
}
