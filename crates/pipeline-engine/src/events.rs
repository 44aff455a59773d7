//! Event types for observing path enumeration
//!
//! Events are sent from the enumerator to any consumer that wants a trace
//! of how paths were produced: progress displays, diagnostics, or tests
//! that need to check ordering guarantees around Pairing joins.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Trait for receiving enumeration events
///
/// This abstracts over the transport mechanism (channel, log, buffer)
/// so the enumerator does not depend on any particular consumer.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g. channel closed)
    fn send(&self, event: EnumerationEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted during path enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EnumerationEvent {
    /// A depth-first walk started at a Capture or Pairing node
    #[serde(rename_all = "camelCase")]
    WalkStarted { node_id: NodeId },

    /// A path prefix reached one input of a Pairing node
    #[serde(rename_all = "camelCase")]
    PrefixArrived { pairing_id: NodeId, input_id: NodeId },

    /// Prefixes from both inputs of a Pairing node were combined
    #[serde(rename_all = "camelCase")]
    PairingJoined {
        pairing_id: NodeId,
        combinations: usize,
    },

    /// A path reached a Termination node
    #[serde(rename_all = "camelCase")]
    PathCompleted { termination_id: NodeId },

    /// A path was cut short by the revisit bound
    #[serde(rename_all = "camelCase")]
    PathTruncated { revisited_id: NodeId },

    /// The work budget ran out before enumeration finished
    #[serde(rename_all = "camelCase")]
    BudgetExhausted { steps: usize },
}

/// Sink that discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EnumerationEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Sink that records events in memory
#[derive(Debug, Default)]
pub struct VecEventSink {
    events: Mutex<Vec<EnumerationEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<EnumerationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EnumerationEvent) -> Result<(), EventError> {
        let mut events = self.events.lock().map_err(|_| EventError {
            message: "Event buffer poisoned".to_string(),
        })?;
        events.push(event);
        Ok(())
    }
}
