//! Platform-agnostic types for BWT Ultra Compact water softeners.
//!
//! This crate provides the shared types used by the BLE core (bwt-core)
//! and the command-line front end.
//!
//! # Features
//!
//! - Device endpoint identity ([`DeviceAddress`], [`Passkey`], [`DeviceConfig`])
//! - The salt level codec ([`SaltLevel::decode`])
//! - Connection status reported with every poll
//! - UUID constants for the BWT GATT service
//!
//! # Example
//!
//! ```
//! use bwt_types::{DeviceConfig, SaltLevel};
//!
//! let config = DeviceConfig::from_input("AA:BB:CC:DD:EE:FF", "123456").unwrap();
//! assert_eq!(config.address.to_string(), "AA:BB:CC:DD:EE:FF");
//!
//! let decoded = SaltLevel::decode(&[0x04]);
//! assert_eq!(decoded.level.value(), 4);
//! ```

pub mod device;
pub mod error;
pub mod types;
pub mod uuid;

pub use device::{DEFAULT_NAME, DEFAULT_PASSKEY, DeviceAddress, DeviceConfig, Passkey};
pub use error::{ParseError, ParseResult};
pub use types::{ConnectionStatus, DecodeFallback, Decoded, SaltLevel};
pub use uuid as uuids;
