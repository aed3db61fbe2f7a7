//! Testing utilities for eventwait workspace
//!
//! Shared test helpers, fixtures, and payload builders.

#![allow(missing_docs)]

use eventwait::{ids, ElementId, EventPayload, EventWaiter, StructureChangeType, WaiterConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Config where providers append without waiting for a wait in progress
pub fn ungated_config() -> WaiterConfig {
    WaiterConfig::new()
        .with_default_quiescence(Duration::from_millis(100))
        .without_receive_gate()
}

/// Config with the receive gate on and a short default quiescence
pub fn gated_config(gate: Duration) -> WaiterConfig {
    WaiterConfig::new()
        .with_default_quiescence(Duration::from_millis(100))
        .with_receive_gate(gate)
}

/// Shared, armed waiter
pub fn armed_waiter(config: WaiterConfig) -> Arc<EventWaiter> {
    let waiter = Arc::new(EventWaiter::with_config(config));
    waiter.arm();
    waiter
}

pub fn name_changed(old: &str, new: &str) -> EventPayload {
    EventPayload::property_changed(ids::NAME, old, new)
}

pub fn enabled_changed(enabled: bool) -> EventPayload {
    EventPayload::property_changed(ids::IS_ENABLED, !enabled, enabled)
}

pub fn child_added() -> EventPayload {
    EventPayload::StructureChanged {
        change: StructureChangeType::ChildAdded,
    }
}

pub fn invoked() -> EventPayload {
    EventPayload::Generic { event: ids::INVOKED }
}

pub fn focus_on(element: ElementId) -> EventPayload {
    EventPayload::FocusChanged { element }
}

/// Payload carrying its dispatch index, for order checks
pub fn numbered(index: usize) -> EventPayload {
    EventPayload::property_changed(ids::VALUE, serde_json::Value::Null, index)
}

/// Dispatch index carried by a [`numbered`] payload
pub fn number_of(payload: &EventPayload) -> Option<usize> {
    match payload {
        EventPayload::PropertyChanged { new_value, .. } => {
            new_value.as_u64().and_then(|n| usize::try_from(n).ok())
        }
        _ => None,
    }
}

/// Small parent map standing in for the accessibility tree
#[derive(Debug, Default, Clone)]
pub struct FakeTree {
    parents: HashMap<ElementId, ElementId>,
}

impl FakeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_child(mut self, parent: ElementId, child: ElementId) -> Self {
        self.parents.insert(child, parent);
        self
    }
}

impl eventwait::ElementTree for FakeTree {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.parents.get(&element).copied()
    }
}
