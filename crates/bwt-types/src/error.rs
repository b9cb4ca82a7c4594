//! Error types for input validation in bwt-types.

use thiserror::Error;

/// Errors that can occur when parsing operator-supplied device settings.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in bwt-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The MAC address is empty or not six hex pairs separated by `:` or `-`.
    #[error("invalid MAC address '{0}': expected six hex byte pairs like AA:BB:CC:DD:EE:FF")]
    InvalidMacAddress(String),

    /// The passkey is not exactly six ASCII digits.
    #[error("invalid passkey: expected exactly 6 digits")]
    InvalidPasskey,

    /// A salt level outside 1-5 was supplied where a valid level is required.
    #[error("invalid salt level {0}: expected 1-5")]
    InvalidSaltLevel(u8),
}

impl ParseError {
    /// Short machine-readable code for this error.
    ///
    /// These match the form error keys the setup flow reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMacAddress(_) => "invalid_mac_address",
            Self::InvalidPasskey => "invalid_passkey",
            Self::InvalidSaltLevel(_) => "invalid_salt_level",
        }
    }
}

/// Result type alias using bwt-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
