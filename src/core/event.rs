//! Events delivered to a machine.
//!
//! An event is a named signal with an optional JSON payload. Bare strings
//! convert into payload-less events, so `send("POINTER_UP")` and
//! `send(Event::new("POINTER_UP"))` are equivalent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type delivered to the initial state's entry actions and activities
/// when an interpreter starts.
pub const INIT_EVENT: &str = "machine.init";

/// A signal processed by an interpreter.
///
/// # Example
///
/// ```rust
/// use machina::Event;
/// use serde_json::json;
///
/// let plain = Event::new("FOCUS");
/// assert_eq!(plain.event_type(), "FOCUS");
/// assert!(plain.payload().is_null());
///
/// let with_data = Event::with_payload("POINTER_MOVE", json!({ "x": 12, "y": 40 }));
/// assert_eq!(with_data.payload()["x"], 12);
///
/// let sugar: Event = "BLUR".into();
/// assert_eq!(sugar, Event::new("BLUR"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
}

impl Event {
    /// Create a payload-less event.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Value::Null,
        }
    }

    /// Create an event carrying a JSON payload.
    pub fn with_payload(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// The synthetic event delivered when a machine enters its initial state.
    pub(crate) fn init() -> Self {
        Self::new(INIT_EVENT)
    }

    /// The event's type name.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The event's payload; `Value::Null` when none was attached.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl From<&str> for Event {
    fn from(event_type: &str) -> Self {
        Self::new(event_type)
    }
}

impl From<String> for Event {
    fn from(event_type: String) -> Self {
        Self::new(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_converts_to_event() {
        let event: Event = "POINTER_DOWN".into();
        assert_eq!(event.event_type(), "POINTER_DOWN");
        assert!(event.payload().is_null());
    }

    #[test]
    fn payload_is_preserved() {
        let event = Event::with_payload("POINTER_MOVE", json!({ "x": 3 }));
        assert_eq!(event.payload()["x"], 3);
    }

    #[test]
    fn init_event_uses_reserved_type() {
        assert_eq!(Event::init().event_type(), INIT_EVENT);
    }

    #[test]
    fn event_serializes_with_type_key() {
        let event = Event::new("FOCUS");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"FOCUS"}"#);

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }
}
