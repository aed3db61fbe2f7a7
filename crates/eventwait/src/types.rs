//! Event data model
//!
//! Defines what a provider hands to the waiter:
//! - Element identity (opaque, comparable)
//! - Event kinds and their tagged payloads
//! - Captured events as stored by the waiter

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Instant;
use uuid::Uuid;

/// Opaque handle identifying a source element in the accessibility tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    /// Generate a fresh element handle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build a deterministic handle, mostly useful for fixtures
    #[inline]
    #[must_use]
    pub const fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Programmatic name of an automation property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub Cow<'static, str>);

impl PropertyId {
    /// Property id from a static programmatic name
    #[inline]
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Property id from an owned name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Programmatic name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Programmatic name of a generic automation event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AutomationEventId(pub Cow<'static, str>);

impl AutomationEventId {
    /// Event id from a static programmatic name
    #[inline]
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Event id from an owned name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Programmatic name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AutomationEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known property and event ids
pub mod ids {
    use super::{AutomationEventId, PropertyId};

    pub const BOUNDING_RECTANGLE: PropertyId = PropertyId::from_static("AutomationElementIdentifiers.BoundingRectangleProperty");
    pub const NAME: PropertyId = PropertyId::from_static("AutomationElementIdentifiers.NameProperty");
    pub const IS_ENABLED: PropertyId = PropertyId::from_static("AutomationElementIdentifiers.IsEnabledProperty");
    pub const HAS_KEYBOARD_FOCUS: PropertyId = PropertyId::from_static("AutomationElementIdentifiers.HasKeyboardFocusProperty");
    pub const IS_OFFSCREEN: PropertyId = PropertyId::from_static("AutomationElementIdentifiers.IsOffscreenProperty");
    pub const TOGGLE_STATE: PropertyId = PropertyId::from_static("TogglePatternIdentifiers.ToggleStateProperty");
    pub const VALUE: PropertyId = PropertyId::from_static("ValuePatternIdentifiers.ValueProperty");
    pub const IS_SELECTED: PropertyId = PropertyId::from_static("SelectionItemPatternIdentifiers.IsSelectedProperty");
    pub const EXPAND_COLLAPSE_STATE: PropertyId = PropertyId::from_static("ExpandCollapsePatternIdentifiers.ExpandCollapseStateProperty");

    pub const INVOKED: AutomationEventId = AutomationEventId::from_static("InvokePatternIdentifiers.InvokedEvent");
    pub const WINDOW_OPENED: AutomationEventId = AutomationEventId::from_static("WindowPatternIdentifiers.WindowOpenedEvent");
    pub const WINDOW_CLOSED: AutomationEventId = AutomationEventId::from_static("WindowPatternIdentifiers.WindowClosedEvent");
    pub const ELEMENT_SELECTED: AutomationEventId = AutomationEventId::from_static("SelectionItemPatternIdentifiers.ElementSelectedEvent");
    pub const ELEMENT_ADDED_TO_SELECTION: AutomationEventId = AutomationEventId::from_static("SelectionItemPatternIdentifiers.ElementAddedToSelectionEvent");
    pub const ELEMENT_REMOVED_FROM_SELECTION: AutomationEventId = AutomationEventId::from_static("SelectionItemPatternIdentifiers.ElementRemovedFromSelectionEvent");
    pub const INVALIDATED: AutomationEventId = AutomationEventId::from_static("SelectionPatternIdentifiers.InvalidatedEvent");
    pub const TEXT_SELECTION_CHANGED: AutomationEventId = AutomationEventId::from_static("TextPatternIdentifiers.TextSelectionChangedEvent");
    pub const INPUT_REACHED_TARGET: AutomationEventId = AutomationEventId::from_static("SynchronizedInputPatternIdentifiers.InputReachedTargetEvent");
}

/// Kind of structural change reported by a structure-changed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureChangeType {
    ChildAdded,
    ChildRemoved,
    ChildrenInvalidated,
    ChildrenBulkAdded,
    ChildrenBulkRemoved,
    ChildrenReordered,
}

/// Event kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PropertyChanged,
    StructureChanged,
    FocusChanged,
    Generic,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PropertyChanged => "property-changed",
            Self::StructureChanged => "structure-changed",
            Self::FocusChanged => "focus-changed",
            Self::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// Payload carried by an event, shaped by its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// An automation property changed value
    PropertyChanged {
        property: PropertyId,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
    },
    /// Children of the source were added, removed or reordered
    StructureChanged { change: StructureChangeType },
    /// Keyboard focus moved to `element`
    FocusChanged { element: ElementId },
    /// Any other automation event
    Generic { event: AutomationEventId },
}

impl EventPayload {
    /// Kind tag of this payload
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PropertyChanged { .. } => EventKind::PropertyChanged,
            Self::StructureChanged { .. } => EventKind::StructureChanged,
            Self::FocusChanged { .. } => EventKind::FocusChanged,
            Self::Generic { .. } => EventKind::Generic,
        }
    }

    /// Property-changed payload
    pub fn property_changed(
        property: PropertyId,
        old_value: impl Into<serde_json::Value>,
        new_value: impl Into<serde_json::Value>,
    ) -> Self {
        Self::PropertyChanged {
            property,
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    /// Short human readable description for logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PropertyChanged {
                property,
                old_value,
                new_value,
            } => format!("{property} NewValue[{new_value}] OldValue[{old_value}]"),
            Self::StructureChanged { change } => format!("StructureChangeType[{change:?}]"),
            Self::FocusChanged { element } => format!("FocusChanged[{element}]"),
            Self::Generic { event } => event.to_string(),
        }
    }
}

/// An event as recorded by the waiter
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    /// Position in the captured list at the time of capture
    pub sequence: usize,
    /// Element that raised the event
    pub source: ElementId,
    /// Event data
    pub payload: EventPayload,
    /// When the waiter appended the event
    pub arrived_at: Instant,
}

impl CapturedEvent {
    /// Kind tag of the captured payload
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_matches_variant() {
        let p = EventPayload::property_changed(ids::NAME, "a", "b");
        assert_eq!(p.kind(), EventKind::PropertyChanged);

        let s = EventPayload::StructureChanged {
            change: StructureChangeType::ChildAdded,
        };
        assert_eq!(s.kind(), EventKind::StructureChanged);

        let f = EventPayload::FocusChanged {
            element: ElementId::from_u128(7),
        };
        assert_eq!(f.kind(), EventKind::FocusChanged);

        let g = EventPayload::Generic { event: ids::INVOKED };
        assert_eq!(g.kind(), EventKind::Generic);
    }

    #[test]
    fn static_and_owned_ids_compare_equal() {
        let owned = PropertyId::new("AutomationElementIdentifiers.NameProperty");
        assert_eq!(owned, ids::NAME);
        assert_eq!(ids::INVOKED.name(), "InvokePatternIdentifiers.InvokedEvent");
    }

    #[test]
    fn describe_property_change() {
        let p = EventPayload::property_changed(ids::IS_ENABLED, false, true);
        let text = p.describe();
        assert!(text.contains("IsEnabledProperty"));
        assert!(text.contains("NewValue[true]"));
    }

    #[test]
    fn element_ids_are_unique() {
        assert_ne!(ElementId::new(), ElementId::new());
        assert_eq!(ElementId::from_u128(1), ElementId::from_u128(1));
    }
}
