//! Error types surfaced by bridged calls
//!
//! A bridged call fails in one of three ways: the ambient cancellation signal
//! was observed at a checkpoint, the wrapped operation reported its own error,
//! or the operation dropped its completion handle without ever invoking it.

use std::path::PathBuf;

/// The call was abandoned because cancellation was observed at a checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Failure of a fallible bridged call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError<E> {
    /// Cancellation was observed at entry or when the completion fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The wrapped operation completed with this error, passed through verbatim.
    #[error("operation failed: {0}")]
    Operation(E),

    /// The completion handle was dropped without being invoked.
    #[error("completion handle dropped without being invoked")]
    Abandoned,
}

impl<E> BridgeError<E> {
    /// Whether this failure is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The operation's own error, if that is what this failure carries.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(error) => Some(error),
            Self::Cancelled | Self::Abandoned => None,
        }
    }

    /// Map the operation error while leaving bridge-level failures untouched.
    pub fn map_operation<F, O>(self, f: O) -> BridgeError<F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            Self::Cancelled => BridgeError::Cancelled,
            Self::Operation(error) => BridgeError::Operation(f(error)),
            Self::Abandoned => BridgeError::Abandoned,
        }
    }
}

impl<E> From<Cancelled> for BridgeError<E> {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for [`crate::BridgeConfig`]
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A key was given a value it does not accept
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// Rejected value
        value: String,
    },

    /// The key does not name a configuration field
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    /// Fields that are individually valid but conflict with each other
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the conflict
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
