//! Error types for bwt-core.
//!
//! These errors stay inside the crate's lower layers. [`crate::Poller`]
//! converts every one of them into a [`ConnectionStatus`] so callers always
//! get a `(value, status)` pair.
//!
//! ## Error to status mapping
//!
//! | Error | Status | Retried on connect |
//! |-------|--------|--------------------|
//! | [`Error::DeviceNotFound`] | `device_not_found` | no |
//! | [`Error::ConnectionFailed`] | `connection_error` | depends on reason |
//! | [`Error::Timeout`] | `connection_error` | yes |
//! | [`Error::Bluetooth`] | `connection_error` | yes |
//! | [`Error::ReadFailed`] | `connection_error` | yes |
//! | [`Error::NotConnected`] | `connection_error` | yes |
//! | [`Error::CharacteristicNotFound`] | `connection_error` | no |
//! | [`Error::InvalidConfig`] | `connection_error` | no |
//! | [`Error::Cancelled`] | `connection_error` | no |
//!
//! An out-of-range payload is not an error: it decodes to the default level.

use std::time::Duration;

use bwt_types::ConnectionStatus;
use thiserror::Error;

/// Errors that can occur when talking to a BWT device.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The resolver could not map the address to a reachable device.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to device.
    #[error("Not connected to device")]
    NotConnected,

    /// Opening the transport failed.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device address that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Reading a characteristic failed.
    #[error("Read failed on characteristic {uuid}: {reason}")]
    ReadFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Operation was cancelled (poller shut down).
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid device settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// The host refused Bluetooth access.
    AdapterUnavailable,
    /// The BLE stack timed out the link attempt.
    Timeout,
    /// All connection attempts failed.
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Message from the last failure.
        last_error: String,
    },
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::RetriesExhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {} attempts: {}", attempts, last_error),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// Device with the given address is not known to the adapter.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a read failure.
    pub fn read_failed(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Status reported to the caller when a poll ends with this error.
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::DeviceNotFound(_) => ConnectionStatus::DeviceNotFound,
            _ => ConnectionStatus::ConnectionError,
        }
    }
}

impl From<bwt_types::ParseError> for Error {
    fn from(err: bwt_types::ParseError) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

/// Result type alias using bwt-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
