//! Expectation checks over a completed wait
//!
//! Checks only exist on [`WaitOutcome`], so an assertion cannot run before
//! the test has waited for events.

use crate::error::VerificationError;
use crate::types::{AutomationEventId, CapturedEvent, ElementId, EventPayload, PropertyId, StructureChangeType};
use crate::waiter::WaitOutcome;
use serde::{Deserialize, Serialize};

/// Whether an event fired, or whether it is expected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventFired {
    Fired,
    NotFired,
    /// The test does not care either way
    Undetermined,
}

impl From<bool> for EventFired {
    fn from(fired: bool) -> Self {
        if fired {
            Self::Fired
        } else {
            Self::NotFired
        }
    }
}

/// Severity a caller attaches to a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckType {
    IncorrectElementConfiguration,
    Verification,
    InformationalException,
    Warning,
    KnownProductIssue,
}

/// Parent lookup over the accessibility tree
///
/// Used to accept a focus change on a descendant of the expected element,
/// e.g. the edit box inside a combo box.
pub trait ElementTree {
    /// Parent of `element`, `None` at the root
    fn parent(&self, element: ElementId) -> Option<ElementId>;
}

impl<F> ElementTree for F
where
    F: Fn(ElementId) -> Option<ElementId>,
{
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self(element)
    }
}

/// Description of an event a test looks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMatcher {
    /// Property change of `property` raised by `source`
    Property { source: ElementId, property: PropertyId },
    /// Structure change of type `change` raised by `source`
    Structure { source: ElementId, change: StructureChangeType },
    /// Generic automation event raised by `source`
    Generic { source: ElementId, event: AutomationEventId },
    /// Focus landed on `element` or one of its descendants
    Focus { element: ElementId },
}

impl EventMatcher {
    /// Name used in verification messages
    #[must_use]
    pub fn event_name(&self) -> String {
        match self {
            Self::Property { property, .. } => property.to_string(),
            Self::Structure { change, .. } => format!("{change:?}"),
            Self::Generic { event, .. } => event.to_string(),
            Self::Focus { .. } => "Focus".to_string(),
        }
    }

    /// Whether `event` satisfies this matcher
    pub fn matches(&self, event: &CapturedEvent, tree: Option<&dyn ElementTree>) -> bool {
        match (self, &event.payload) {
            (Self::Property { source, property }, EventPayload::PropertyChanged { property: p, .. }) => {
                *source == event.source && property == p
            }
            (Self::Structure { source, change }, EventPayload::StructureChanged { change: c }) => {
                *source == event.source && change == c
            }
            (Self::Generic { source, event: id }, EventPayload::Generic { event: e }) => {
                *source == event.source && id == e
            }
            (Self::Focus { element }, EventPayload::FocusChanged { .. }) => {
                is_self_or_descendant(event.source, *element, tree)
            }
            _ => false,
        }
    }
}

/// Walk up from `candidate` looking for `ancestor`
fn is_self_or_descendant(candidate: ElementId, ancestor: ElementId, tree: Option<&dyn ElementTree>) -> bool {
    if candidate == ancestor {
        return true;
    }
    let Some(tree) = tree else {
        return false;
    };

    // Bounded so a cyclic tree cannot spin forever
    let mut current = candidate;
    for _ in 0..1024 {
        match tree.parent(current) {
            Some(parent) if parent == ancestor => return true,
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

impl WaitOutcome {
    /// Captured events satisfying `matcher`
    pub fn matching<'a>(
        &'a self,
        matcher: &'a EventMatcher,
        tree: Option<&'a dyn ElementTree>,
    ) -> impl Iterator<Item = &'a CapturedEvent> + 'a {
        self.captured.iter().filter(move |e| matcher.matches(e, tree))
    }

    /// Number of captured events satisfying `matcher`
    #[must_use]
    pub fn count_matching(&self, matcher: &EventMatcher, tree: Option<&dyn ElementTree>) -> usize {
        self.matching(matcher, tree).count()
    }

    /// Whether any captured event satisfies `matcher`
    #[must_use]
    pub fn was_fired(&self, matcher: &EventMatcher, tree: Option<&dyn ElementTree>) -> EventFired {
        let fired = self.matching(matcher, tree).next().is_some();
        tracing::debug!(event = %matcher.event_name(), fired, total = self.observed, "looked for event");
        EventFired::from(fired)
    }

    /// Fail unless exactly `expected` events were captured
    ///
    /// # Errors
    /// Returns `VerificationError::CountMismatch` carrying `check`.
    pub fn verify_count(&self, expected: usize, check: CheckType) -> Result<(), VerificationError> {
        if self.observed != expected {
            return Err(VerificationError::CountMismatch {
                expected,
                observed: self.observed,
                check,
            });
        }
        Ok(())
    }

    /// Fail when the firing of `matcher` contradicts `should_fire`
    ///
    /// `Undetermined` only logs what happened.
    ///
    /// # Errors
    /// Returns `VerificationError::NotFired` or `UnexpectedlyFired` carrying
    /// `check`.
    pub fn verify_fired(
        &self,
        matcher: &EventMatcher,
        should_fire: EventFired,
        tree: Option<&dyn ElementTree>,
        check: CheckType,
    ) -> Result<(), VerificationError> {
        let actual = self.was_fired(matcher, tree);
        let name = matcher.event_name();

        if should_fire == EventFired::Undetermined {
            tracing::info!(event = %name, ?actual, "firing of event is undetermined");
            return Ok(());
        }
        if actual != should_fire {
            return Err(VerificationError::fired_mismatch(name, actual, check));
        }
        tracing::debug!(event = %name, ?actual, "event firing matched expectation");
        Ok(())
    }
}
