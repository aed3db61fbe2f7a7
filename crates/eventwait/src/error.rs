//! Error types for eventwait
//!
//! The waiter's synchronous API never fails: a timeout is the expected end
//! of every wait. Errors exist only for:
//! - The async adapter (blocking task panicked)
//! - Loading configuration
//! - Verifying a wait outcome against expectations

use crate::verify::{CheckType, EventFired};
use std::path::PathBuf;

/// Errors from the waiter's async adapter
#[derive(Debug, thiserror::Error)]
pub enum WaiterError {
    /// The blocking wait task did not complete
    #[error("wait task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors while loading a waiter configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Well-formed but unusable values
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A wait outcome did not match what the test expected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// Number of captured events differs from the expectation
    #[error("there were {observed} events fired and expected {expected} to be fired")]
    CountMismatch {
        expected: usize,
        observed: usize,
        check: CheckType,
    },

    /// Expected event was not captured
    #[error("{event} event was not fired and was expected to be fired")]
    NotFired { event: String, check: CheckType },

    /// Event was captured although it should not have been
    #[error("{event} event did get fired and was not expected to be fired")]
    UnexpectedlyFired { event: String, check: CheckType },
}

impl VerificationError {
    /// Severity the caller attached to the failed check
    #[inline]
    #[must_use]
    pub fn check(&self) -> CheckType {
        match self {
            Self::CountMismatch { check, .. }
            | Self::NotFired { check, .. }
            | Self::UnexpectedlyFired { check, .. } => *check,
        }
    }

    /// Build the mismatch error for an actual/expected pair
    pub(crate) fn fired_mismatch(event: String, actual: EventFired, check: CheckType) -> Self {
        if actual == EventFired::NotFired {
            Self::NotFired { event, check }
        } else {
            Self::UnexpectedlyFired { event, check }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mismatch_display() {
        let err = VerificationError::CountMismatch {
            expected: 3,
            observed: 1,
            check: CheckType::Verification,
        };
        assert_eq!(
            err.to_string(),
            "there were 1 events fired and expected 3 to be fired"
        );
        assert_eq!(err.check(), CheckType::Verification);
    }

    #[test]
    fn fired_mismatch_picks_variant() {
        let err = VerificationError::fired_mismatch("Focus".into(), EventFired::NotFired, CheckType::Warning);
        assert!(matches!(err, VerificationError::NotFired { .. }));

        let err = VerificationError::fired_mismatch("Focus".into(), EventFired::Fired, CheckType::Warning);
        assert!(matches!(err, VerificationError::UnexpectedlyFired { .. }));
        assert_eq!(err.check(), CheckType::Warning);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid("default_quiescence_ms must be > 0".into());
        assert!(err.to_string().starts_with("invalid config"));
    }
}
