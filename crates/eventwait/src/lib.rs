//! eventwait - waiting for asynchronous accessibility events in UI tests
//!
//! A test arms an [`EventWaiter`], subscribes it to the accessibility
//! provider, performs the action under test and then waits until no event
//! has arrived for a quiescence window. The captured events are then checked
//! against expectations.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eventwait::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let waiter = Arc::new(EventWaiter::new());
//! waiter.arm();
//! provider.subscribe(waiter.clone());   // Arc<dyn EventSink>
//! button.invoke();
//!
//! let outcome = waiter.wait_for_events(1, Duration::from_millis(2000));
//! outcome.verify_count(1, CheckType::Verification)?;
//! outcome.verify_fired(
//!     &EventMatcher::Generic { source: button.id(), event: ids::INVOKED },
//!     EventFired::Fired,
//!     None,
//!     CheckType::Verification,
//! )?;
//! waiter.purge();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod types;
pub mod verify;
pub mod waiter;

// Test harness
pub mod test_harness;

// Re-exports
pub use config::{QuiescenceMode, WaiterConfig};
pub use error::{ConfigError, VerificationError, WaiterError};
pub use provider::{ProviderRun, ScriptStep, ScriptedProvider};
pub use types::{
    ids, AutomationEventId, CapturedEvent, ElementId, EventKind, EventPayload, PropertyId,
    StructureChangeType,
};
pub use verify::{CheckType, ElementTree, EventFired, EventMatcher};
pub use waiter::{EventSink, EventWaiter, WaitOutcome, WaiterStats};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing event tests
    pub use crate::config::{QuiescenceMode, WaiterConfig};
    pub use crate::error::VerificationError;
    pub use crate::types::{ids, ElementId, EventKind, EventPayload, StructureChangeType};
    pub use crate::verify::{CheckType, ElementTree, EventFired, EventMatcher};
    pub use crate::waiter::{EventSink, EventWaiter, WaitOutcome};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
