//! Device endpoint identity: MAC address, passkey, and the bundled config.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Product name used for display titles.
pub const DEFAULT_NAME: &str = "BWT Ultra Compact";

/// Passkey printed on the device label when none was changed.
pub const DEFAULT_PASSKEY: &str = "123456";

/// A Bluetooth MAC address.
///
/// Accepts six hex byte pairs separated by `:` or `-` (mixed separators are
/// allowed), matching `^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$`. Displays in
/// upper-case colon form, which is what BLE stacks report.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    /// Create an address from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Parse an address string.
    pub fn parse(input: &str) -> ParseResult<Self> {
        let invalid = || ParseError::InvalidMacAddress(input.to_string());
        let raw = input.as_bytes();
        if raw.len() != 17 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let start = i * 3;
            let hi = hex_value(raw[start]).ok_or_else(invalid)?;
            let lo = hex_value(raw[start + 1]).ok_or_else(invalid)?;
            *byte = (hi << 4) | lo;

            if i < 5 && !matches!(raw[start + 2], b':' | b'-') {
                return Err(invalid());
            }
        }
        Ok(Self(bytes))
    }

    /// Raw address bytes.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }

    /// Whether `other` (as reported by a BLE stack) names this address.
    ///
    /// Comparison ignores case and separator style.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        Self::parse(other).is_ok_and(|parsed| parsed == *self)
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl FromStr for DeviceAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceAddress> for String {
    fn from(address: DeviceAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceAddress({})", self)
    }
}

/// Six-digit numeric pairing passkey.
///
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Passkey(String);

impl Passkey {
    /// Parse a passkey; it must be exactly six ASCII digits.
    pub fn parse(input: &str) -> ParseResult<Self> {
        if input.len() == 6 && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(input.to_string()))
        } else {
            Err(ParseError::InvalidPasskey)
        }
    }

    /// The passkey digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Passkey {
    fn default() -> Self {
        Self(DEFAULT_PASSKEY.to_string())
    }
}

impl FromStr for Passkey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Passkey {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Passkey> for String {
    fn from(passkey: Passkey) -> Self {
        passkey.0
    }
}

impl fmt::Debug for Passkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passkey(******)")
    }
}

/// Connection settings for one softener, fixed once set up.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// MAC address of the softener.
    pub address: DeviceAddress,
    /// Pairing passkey.
    #[cfg_attr(feature = "serde", serde(default))]
    pub passkey: Passkey,
    /// Optional operator-chosen label.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub name: Option<String>,
}

impl DeviceConfig {
    /// Create a config from already-validated parts.
    pub fn new(address: DeviceAddress, passkey: Passkey) -> Self {
        Self {
            address,
            passkey,
            name: None,
        }
    }

    /// Validate raw setup-form input.
    ///
    /// Both fields are checked. When both are invalid the passkey error is
    /// reported, matching the setup form which shows a single error.
    pub fn from_input(mac_address: &str, passkey: &str) -> ParseResult<Self> {
        let address = DeviceAddress::parse(mac_address);
        let passkey = Passkey::parse(passkey)?;
        Ok(Self::new(address?, passkey))
    }

    /// Set a display label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Title shown for this device, e.g. `BWT Ultra Compact (AA:BB:CC:DD:EE:FF)`.
    #[must_use]
    pub fn title(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.address),
            None => format!("{} ({})", DEFAULT_NAME, self.address),
        }
    }
}
