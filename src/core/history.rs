//! Transition history tracking.
//!
//! The interpreter records every external transition it takes. History is
//! immutable: `record` returns a new history with the entry appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single external transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State being exited.
    pub from: String,
    /// State being entered.
    pub to: String,
    /// Type of the event that triggered the transition.
    pub event_type: String,
    /// When the transition was taken.
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of external transitions.
///
/// Internal transitions never appear here; they do not change state. External
/// self-transitions do, since they run a full exit/entry cycle.
///
/// # Example
///
/// ```rust
/// use machina::{TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let history = TransitionHistory::new();
/// let history = history.record(TransitionRecord {
///     from: "idle".into(),
///     to: "dragging".into(),
///     event_type: "POINTER_DOWN".into(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.path(), vec!["idle", "dragging"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionHistory {
    records: Vec<TransitionRecord>,
}

impl TransitionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, returning a new history.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// All recorded transitions in order.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The sequence of states traversed: the first record's `from`, then each
    /// record's `to`. Empty when nothing has been recorded.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.records.first() {
            path.push(first.from.as_str());
        }
        for record in &self.records {
            path.push(record.to.as_str());
        }
        path
    }

    /// Elapsed time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}
