//! Bridge configuration
//!
//! Governs how a [`crate::Bridge`] reacts to contract violations by the wrapped
//! operation. Loaded from TOML, optionally overridden by `TETHER_*` environment
//! variables.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "TETHER_";

/// What a call does when its completion handle is dropped without being invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonPolicy {
    /// Settle with an abandonment failure.
    #[default]
    Fail,
    /// Never resume, exactly as if the callback were still outstanding.
    Pend,
}

/// What a shared completion does when it is invoked a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleCompletionPolicy {
    /// Treat it as a fatal programming error.
    Panic,
    /// Log at `error` level and discard the second outcome.
    Log,
}

impl Default for DoubleCompletionPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Log
        }
    }
}

impl FromStr for AbandonPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "pend" => Ok(Self::Pend),
            _ => Err(ConfigError::invalid_value("abandon_policy", value)),
        }
    }
}

impl FromStr for DoubleCompletionPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(Self::Panic),
            "log" => Ok(Self::Log),
            _ => Err(ConfigError::invalid_value("double_completion", value)),
        }
    }
}

impl fmt::Display for AbandonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => f.write_str("fail"),
            Self::Pend => f.write_str("pend"),
        }
    }
}

impl fmt::Display for DoubleCompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panic => f.write_str("panic"),
            Self::Log => f.write_str("log"),
        }
    }
}

/// Configuration for a [`crate::Bridge`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Reaction to a completion handle dropped without being invoked
    pub abandon_policy: AbandonPolicy,
    /// Reaction to a shared completion invoked more than once
    pub double_completion: DoubleCompletionPolicy,
    /// Emit a `trace` event for every settlement
    pub trace_settlements: bool,
}

impl BridgeConfig {
    /// Parse configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `TETHER_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_from_vars(std::env::vars())
    }

    /// Apply `TETHER_*` overrides from the given variables; others are ignored.
    ///
    /// `TETHER_ABANDON_POLICY=pend` maps to `abandon_policy = "pend"`.
    pub fn merge_from_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(ENV_PREFIX) {
                self.set_from_string(&key.to_ascii_lowercase(), &value)?;
            }
        }
        self.validate()
    }

    /// Validate the combination of fields.
    ///
    /// Each field is checked when parsed; this rejects combinations. Under
    /// [`AbandonPolicy::Pend`] an abandoned call hangs with only a `warn`, so
    /// double completions must stay fatal or no contract violation surfaces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.abandon_policy == AbandonPolicy::Pend
            && self.double_completion == DoubleCompletionPolicy::Log
        {
            return Err(ConfigError::invalid(
                "abandon_policy = \"pend\" requires double_completion = \"panic\"",
            ));
        }
        Ok(())
    }

    /// Set a single field from its string form
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "abandon_policy" => self.abandon_policy = value.parse()?,
            "double_completion" => self.double_completion = value.parse()?,
            "trace_settlements" => {
                self.trace_settlements = match value.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" => false,
                    _ => return Err(ConfigError::invalid_value(key, value)),
                };
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
