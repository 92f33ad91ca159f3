/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Turns selection-channel payloads into [`SelectionEvent`]s.
//!
//! Clears are debounced: an empty reading arms a deadline, and the cleared
//! sentinel is only published once the deadline passes without a new
//! non-empty selection. A zero settle delay publishes clears immediately.

use std::fmt;
use std::time::{Duration, Instant};

use embedshell_core::SelectionEvent;
use serde_json::Value;

#[derive(Debug)]
pub enum SelectionPayloadError {
    /// Not an object, or a string that doesn't hold one.
    NotAnObject,
    Malformed(serde_json::Error),
}

impl fmt::Display for SelectionPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("selection payload is not an object"),
            Self::Malformed(error) => write!(f, "malformed selection payload: {error}"),
        }
    }
}

impl std::error::Error for SelectionPayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotAnObject => None,
            Self::Malformed(error) => Some(error),
        }
    }
}

#[derive(Debug)]
pub struct SelectionBridge {
    settle: Duration,
    clear_deadline: Option<Instant>,
}

impl SelectionBridge {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            clear_deadline: None,
        }
    }

    /// Deserialize `{text, source}`. Bridges that can only carry strings
    /// deliver the object JSON-encoded, so a string payload is parsed once more.
    pub fn decode(payload: &Value) -> Result<SelectionEvent, SelectionPayloadError> {
        match payload {
            Value::Object(_) => serde_json::from_value(payload.clone())
                .map_err(SelectionPayloadError::Malformed),
            Value::String(encoded) => {
                let inner: Value =
                    serde_json::from_str(encoded).map_err(SelectionPayloadError::Malformed)?;
                if inner.is_object() {
                    Self::decode(&inner)
                } else {
                    Err(SelectionPayloadError::NotAnObject)
                }
            }
            _ => Err(SelectionPayloadError::NotAnObject),
        }
    }

    /// Feed one payload. Returns the event to publish now, if any.
    pub fn receive(
        &mut self,
        payload: &Value,
        now: Instant,
    ) -> Result<Option<SelectionEvent>, SelectionPayloadError> {
        let event = Self::decode(payload)?;
        if !event.is_cleared() {
            self.cancel_pending();
            return Ok(Some(event));
        }
        if self.settle.is_zero() {
            self.cancel_pending();
            return Ok(Some(SelectionEvent::cleared()));
        }
        // Repeated empty readings don't push the deadline back.
        if self.clear_deadline.is_none() {
            self.clear_deadline = Some(now + self.settle);
        }
        Ok(None)
    }

    pub fn cancel_pending(&mut self) -> bool {
        self.clear_deadline.take().is_some()
    }

    /// The cleared sentinel, once an armed clear has settled.
    pub fn poll_due(&mut self, now: Instant) -> Option<SelectionEvent> {
        match self.clear_deadline {
            Some(deadline) if deadline <= now => {
                self.clear_deadline = None;
                Some(SelectionEvent::cleared())
            }
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clear_deadline
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    const SETTLE: Duration = Duration::from_millis(100);

    #[rstest]
    #[case::object(json!({"text": "hello", "source": "example.com"}))]
    #[case::encoded(json!(r#"{"text":"hello","source":"example.com"}"#))]
    fn decode_accepts_object_and_encoded_object(#[case] payload: Value) {
        assert_eq!(
            SelectionBridge::decode(&payload).unwrap(),
            SelectionEvent::new("hello", "example.com")
        );
    }

    #[rstest]
    #[case(json!(42))]
    #[case(json!("not json"))]
    #[case(json!({"text": 7}))]
    fn decode_rejects_malformed_payloads(#[case] payload: Value) {
        assert!(SelectionBridge::decode(&payload).is_err());
    }

    #[test]
    fn missing_fields_read_as_cleared() {
        assert!(SelectionBridge::decode(&json!({})).unwrap().is_cleared());
    }

    #[test]
    fn empty_reading_clears_only_after_settling() {
        let start = Instant::now();
        let mut bridge = SelectionBridge::new(SETTLE);
        bridge
            .receive(&json!({"text": "hello", "source": "a"}), start)
            .unwrap();

        assert_eq!(bridge.receive(&json!({"text": ""}), start).unwrap(), None);
        assert_eq!(bridge.poll_due(start + Duration::from_millis(99)), None);
        assert_eq!(
            bridge.poll_due(start + SETTLE),
            Some(SelectionEvent::cleared())
        );
        assert_eq!(bridge.poll_due(start + SETTLE * 2), None);
    }

    #[test]
    fn reselection_within_window_suppresses_clear() {
        let start = Instant::now();
        let mut bridge = SelectionBridge::new(SETTLE);
        let hello = json!({"text": "hello", "source": "example.com"});
        bridge.receive(&hello, start).unwrap();
        bridge
            .receive(&json!({"text": "", "source": ""}), start + Duration::from_millis(10))
            .unwrap();

        let again = bridge
            .receive(&hello, start + Duration::from_millis(50))
            .unwrap();

        assert_eq!(again, Some(SelectionEvent::new("hello", "example.com")));
        assert_eq!(bridge.next_deadline(), None);
        assert_eq!(bridge.poll_due(start + SETTLE * 3), None);
    }

    #[test]
    fn zero_settle_clears_immediately() {
        let mut bridge = SelectionBridge::new(Duration::ZERO);
        assert_eq!(
            bridge.receive(&json!({"text": ""}), Instant::now()).unwrap(),
            Some(SelectionEvent::cleared())
        );
    }

    proptest! {
        #[test]
        fn repeated_empty_readings_keep_first_deadline(offsets in prop::collection::vec(1u64..90, 0..10)) {
            let start = Instant::now();
            let mut bridge = SelectionBridge::new(SETTLE);
            bridge.receive(&json!({"text": ""}), start).unwrap();
            for offset in offsets {
                bridge.receive(&json!({"text": ""}), start + Duration::from_millis(offset)).unwrap();
            }
            prop_assert_eq!(bridge.next_deadline(), Some(start + SETTLE));
        }
    }
}
