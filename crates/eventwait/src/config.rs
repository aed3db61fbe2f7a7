//! Waiter configuration
//!
//! Loaded from an optional TOML file, then adjusted with `with_*` builders.
//! Durations are expressed in milliseconds on disk.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the quiescence window relates to the expected event count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuiescenceMode {
    /// The window is exactly the requested quiescence
    #[default]
    Fixed,
    /// The window is the requested quiescence times `max(expected, 1)`
    PerExpectedEvent,
}

impl QuiescenceMode {
    /// Effective window for a wait
    #[must_use]
    pub fn window(self, expected: usize, quiescence: Duration) -> Duration {
        match self {
            Self::Fixed => quiescence,
            Self::PerExpectedEvent => {
                let factor = u32::try_from(expected.max(1)).unwrap_or(u32::MAX);
                quiescence.saturating_mul(factor)
            }
        }
    }
}

/// Waiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawConfig", into = "RawConfig")]
pub struct WaiterConfig {
    /// Quiescence used by callers that do not pick one
    pub default_quiescence: Duration,
    /// How long a provider callback is held waiting for ready-to-receive;
    /// `None` lets callbacks append immediately
    pub receive_gate: Option<Duration>,
    /// Window scaling
    pub quiescence_mode: QuiescenceMode,
}

impl WaiterConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default quiescence
    #[inline]
    #[must_use]
    pub fn with_default_quiescence(mut self, quiescence: Duration) -> Self {
        self.default_quiescence = quiescence;
        self
    }

    /// With receive gate timeout
    #[inline]
    #[must_use]
    pub fn with_receive_gate(mut self, timeout: Duration) -> Self {
        self.receive_gate = Some(timeout);
        self
    }

    /// Let provider callbacks append without waiting for a wait in progress
    #[inline]
    #[must_use]
    pub fn without_receive_gate(mut self) -> Self {
        self.receive_gate = None;
        self
    }

    /// With quiescence mode
    #[inline]
    #[must_use]
    pub fn with_quiescence_mode(mut self, mode: QuiescenceMode) -> Self {
        self.quiescence_mode = mode;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed TOML and
    /// `ConfigError::Invalid` when the values are unusable.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`WaiterConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded waiter config");
        Ok(config)
    }

    /// Check invariants
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` when the default quiescence is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_quiescence.is_zero() {
            return Err(ConfigError::Invalid(
                "default_quiescence_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    #[must_use]
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            default_quiescence: Duration::from_millis(2000),
            receive_gate: Some(Duration::from_millis(1000)),
            quiescence_mode: QuiescenceMode::Fixed,
        }
    }
}

/// On-disk shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawConfig {
    default_quiescence_ms: u64,
    receive_gate_ms: u64,
    quiescence_mode: QuiescenceMode,
}

impl Default for RawConfig {
    fn default() -> Self {
        WaiterConfig::default().into()
    }
}

impl From<RawConfig> for WaiterConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            default_quiescence: Duration::from_millis(raw.default_quiescence_ms),
            receive_gate: (raw.receive_gate_ms > 0).then(|| Duration::from_millis(raw.receive_gate_ms)),
            quiescence_mode: raw.quiescence_mode,
        }
    }
}

impl From<WaiterConfig> for RawConfig {
    fn from(config: WaiterConfig) -> Self {
        let millis = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self {
            default_quiescence_ms: millis(config.default_quiescence),
            receive_gate_ms: config.receive_gate.map_or(0, millis),
            quiescence_mode: config.quiescence_mode,
        }
    }
}
