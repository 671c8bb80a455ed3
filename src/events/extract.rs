//! Attribute extraction and dedup keys.
//!
//! A transaction's event log is a flat, ordered list. Each `message` event
//! whose `action` is the wanted type opens a logical message; every
//! attribute that follows belongs to it until the next `message/action`.

use std::collections::HashMap;

use alloy::primitives::{keccak256, B256};

use crate::events::types::{AbciEvent, ATTRIBUTE_KEY_ACTION, EVENT_TYPE_MESSAGE};

/// A `(event type, attribute)` pair that must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequiredAttribute {
    pub event_type: &'static str,
    pub attribute: &'static str,
}

impl RequiredAttribute {
    pub const fn new(event_type: &'static str, attribute: &'static str) -> Self {
        Self {
            event_type,
            attribute,
        }
    }
}

/// Attributes of one logical message, keyed by `(event type, attribute)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedEvent {
    attributes: HashMap<(String, String), String>,
}

impl ProcessedEvent {
    pub fn insert(&mut self, event_type: &str, attribute: &str, value: &str) {
        self.attributes
            .insert((event_type.to_string(), attribute.to_string()), value.to_string());
    }

    pub fn get(&self, event_type: &str, attribute: &str) -> Option<&str> {
        self.attributes
            .get(&(event_type.to_string(), attribute.to_string()))
            .map(String::as_str)
    }

    /// Value of a required attribute; present by construction.
    pub fn required(&self, required: &RequiredAttribute) -> &str {
        self.get(required.event_type, required.attribute).unwrap_or_default()
    }

    pub fn has_all(&self, required: &[RequiredAttribute]) -> bool {
        required
            .iter()
            .all(|r| self.get(r.event_type, r.attribute).is_some())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn absorb(&mut self, event: &AbciEvent) {
        for attribute in &event.attributes {
            self.insert(&event.kind, &attribute.key, &attribute.value);
        }
    }
}

/// Result of scanning one transaction for one message type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Complete messages, in log order.
    pub events: Vec<ProcessedEvent>,
    /// Logical messages seen, complete or not.
    pub total: usize,
}

impl Extraction {
    /// Messages dropped for lacking a required attribute.
    pub fn missing(&self) -> usize {
        self.total - self.events.len()
    }
}

/// Split `events` into the logical messages of type `msg_type` and keep
/// those carrying every `required` attribute.
pub fn process_events(
    events: &[AbciEvent],
    msg_type: &str,
    required: &[RequiredAttribute],
) -> Extraction {
    let mut extraction = Extraction::default();
    let mut current: Option<ProcessedEvent> = None;

    let close = |current: &mut Option<ProcessedEvent>, extraction: &mut Extraction| {
        if let Some(done) = current.take() {
            extraction.total += 1;
            if done.has_all(required) {
                extraction.events.push(done);
            }
        }
    };

    for event in events {
        if event.kind == EVENT_TYPE_MESSAGE {
            if let Some(action) = event.attribute(ATTRIBUTE_KEY_ACTION) {
                close(&mut current, &mut extraction);
                if action == msg_type {
                    let mut opened = ProcessedEvent::default();
                    opened.absorb(event);
                    current = Some(opened);
                }
                continue;
            }
        }
        if let Some(open) = current.as_mut() {
            open.absorb(event);
        }
    }
    close(&mut current, &mut extraction);
    extraction
}

/// Treat every event of `event_type` as one logical message.
///
/// Used for EVM transactions, which carry no per-message `action`.
pub fn process_typed_events(
    events: &[AbciEvent],
    event_type: &str,
    required: &[RequiredAttribute],
) -> Extraction {
    let mut extraction = Extraction::default();
    for event in events.iter().filter(|e| e.kind == event_type) {
        extraction.total += 1;
        let mut processed = ProcessedEvent::default();
        processed.absorb(event);
        if processed.has_all(required) {
            extraction.events.push(processed);
        }
    }
    extraction
}

/// `keccak256(tx_hash ‖ for each required: event ‖ attr ‖ value of every event)`.
pub fn dedup_key(tx_hash: &str, required: &[RequiredAttribute], events: &[ProcessedEvent]) -> B256 {
    let mut raw = String::from(tx_hash);
    for r in required {
        raw.push_str(r.event_type);
        raw.push_str(r.attribute);
        for event in events {
            raw.push_str(event.required(r));
        }
    }
    keccak256(raw.as_bytes())
}
