//! Core types for BWT salt level data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Salt level reported by the softener, always in `1..=5`.
///
/// Construct with [`SaltLevel::new`] or decode a raw characteristic payload
/// with [`SaltLevel::decode`]. There is no way to build an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct SaltLevel(u8);

impl SaltLevel {
    /// Lowest level the device reports.
    pub const MIN: u8 = 1;
    /// Highest level the device reports.
    pub const MAX: u8 = 5;
    /// Level substituted when a payload is empty or out of range.
    pub const DEFAULT: SaltLevel = SaltLevel(3);

    /// Create a salt level, returning `None` outside `1..=5`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The numeric level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Decode a characteristic payload.
    ///
    /// Byte 0 is the level. Empty payloads and levels outside `1..=5` decode
    /// to [`SaltLevel::DEFAULT`]; the returned [`Decoded::fallback`] says why.
    /// Trailing bytes are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use bwt_types::{DecodeFallback, SaltLevel};
    ///
    /// assert_eq!(SaltLevel::decode(&[4]).level.value(), 4);
    /// assert_eq!(SaltLevel::decode(&[]).fallback, Some(DecodeFallback::Empty));
    /// assert_eq!(SaltLevel::decode(&[9]).level, SaltLevel::DEFAULT);
    /// ```
    #[must_use]
    pub fn decode(data: &[u8]) -> Decoded {
        match data.first() {
            None => Decoded {
                level: Self::DEFAULT,
                fallback: Some(DecodeFallback::Empty),
            },
            Some(&byte) => match Self::new(byte) {
                Some(level) => Decoded {
                    level,
                    fallback: None,
                },
                None => Decoded {
                    level: Self::DEFAULT,
                    fallback: Some(DecodeFallback::OutOfRange(byte)),
                },
            },
        }
    }
}

impl TryFrom<u8> for SaltLevel {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ParseError::InvalidSaltLevel(value))
    }
}

impl From<SaltLevel> for u8 {
    fn from(level: SaltLevel) -> Self {
        level.0
    }
}

impl fmt::Display for SaltLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why [`SaltLevel::decode`] substituted the default level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "reason", content = "byte", rename_all = "snake_case"))]
pub enum DecodeFallback {
    /// The characteristic returned no bytes.
    Empty,
    /// Byte 0 was outside `1..=5`.
    OutOfRange(u8),
}

impl fmt::Display for DecodeFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::OutOfRange(byte) => write!(f, "level {} outside 1-5", byte),
        }
    }
}

/// Result of decoding a salt level payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded (or substituted) level.
    pub level: SaltLevel,
    /// Set when the default level was substituted.
    pub fallback: Option<DecodeFallback>,
}

impl Decoded {
    /// Whether the payload carried a valid level.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.fallback.is_none()
    }
}

/// Connectivity status surfaced alongside every poll result.
///
/// Serialized in snake_case (`"connected"`, `"device_not_found"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConnectionStatus {
    /// No poll has completed yet.
    #[default]
    Initializing,
    /// The last poll connected and read the characteristic.
    Connected,
    /// The resolver could not find the device.
    DeviceNotFound,
    /// The device was found but connecting or reading failed.
    ConnectionError,
}

impl ConnectionStatus {
    /// Status string as reported in attributes and JSON output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Connected => "connected",
            Self::DeviceNotFound => "device_not_found",
            Self::ConnectionError => "connection_error",
        }
    }

    /// Whether this status counts as "connected" for a connectivity indicator.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_levels() {
        for byte in 1..=5u8 {
            let decoded = SaltLevel::decode(&[byte]);
            assert_eq!(decoded.level.value(), byte);
            assert!(decoded.is_exact());
        }
    }

    #[test]
    fn test_decode_empty() {
        let decoded = SaltLevel::decode(&[]);
        assert_eq!(decoded.level, SaltLevel::DEFAULT);
        assert_eq!(decoded.fallback, Some(DecodeFallback::Empty));
    }

    #[test]
    fn test_decode_zero_and_six() {
        assert_eq!(
            SaltLevel::decode(&[0]).fallback,
            Some(DecodeFallback::OutOfRange(0))
        );
        assert_eq!(SaltLevel::decode(&[6]).level.value(), 3);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let decoded = SaltLevel::decode(&[2, 0xFF, 0xFF]);
        assert_eq!(decoded.level.value(), 2);
        assert!(decoded.is_exact());
    }

    #[test]
    fn test_new_bounds() {
        assert!(SaltLevel::new(0).is_none());
        assert!(SaltLevel::new(1).is_some());
        assert!(SaltLevel::new(5).is_some());
        assert!(SaltLevel::new(6).is_none());
    }

    #[test]
    fn test_try_from() {
        assert_eq!(SaltLevel::try_from(4).unwrap().value(), 4);
        assert_eq!(
            SaltLevel::try_from(7).unwrap_err(),
            ParseError::InvalidSaltLevel(7)
        );
    }

    #[test]
    fn test_default_is_three() {
        assert_eq!(SaltLevel::DEFAULT.value(), 3);
    }

    #[test]
    fn test_fallback_display() {
        assert_eq!(DecodeFallback::Empty.to_string(), "empty payload");
        assert!(DecodeFallback::OutOfRange(9).to_string().contains('9'));
    }

    #[test]
    fn test_connection_status_strings() {
        assert_eq!(ConnectionStatus::Initializing.as_str(), "initializing");
        assert_eq!(ConnectionStatus::Connected.as_str(), "connected");
        assert_eq!(ConnectionStatus::DeviceNotFound.as_str(), "device_not_found");
        assert_eq!(ConnectionStatus::ConnectionError.as_str(), "connection_error");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Initializing);
    }

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Initializing.is_connected());
        assert!(!ConnectionStatus::DeviceNotFound.is_connected());
        assert!(!ConnectionStatus::ConnectionError.is_connected());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_representations() {
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::DeviceNotFound).unwrap(),
            "\"device_not_found\""
        );
        assert_eq!(serde_json::to_string(&SaltLevel::DEFAULT).unwrap(), "3");
        let level: SaltLevel = serde_json::from_str("5").unwrap();
        assert_eq!(level.value(), 5);
        assert!(serde_json::from_str::<SaltLevel>("0").is_err());
    }
}
