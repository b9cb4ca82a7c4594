//! Core BLE polling client for BWT Ultra Compact water softeners.
//!
//! The softener exposes its salt level (1 to 5) as a single byte on a GATT
//! characteristic. This crate resolves the device, connects with bounded
//! retries, reads and decodes the level, and releases the connection, all
//! behind the [`Resolver`] and [`Transport`] trait seams.
//!
//! # Features
//!
//! - **Polling**: [`Poller::poll`] turns every failure into a
//!   [`ConnectionStatus`]; it never returns an error
//! - **Connection policies**: connect per poll (default) or keep a persistent
//!   session
//! - **Retries**: exponential backoff with jitter on connect, optional on read
//! - **Backends**: btleplug ([`BleResolver`]) and a mock for tests
//!   ([`MockResolver`])
//! - **Events**: status changes and readings on a broadcast channel
//!
//! # Quick Start
//!
//! ```no_run
//! use bwt_core::{BleResolver, Poller, PollerConfig};
//! use bwt_types::DeviceConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = DeviceConfig::from_input("AA:BB:CC:DD:EE:FF", "123456")?;
//!     let resolver = BleResolver::first_adapter().await?;
//!     let poller = Poller::new(resolver, device, PollerConfig::default())?;
//!
//!     let outcome = poller.poll().await;
//!     println!("salt level {:?} ({})", outcome.level, outcome.status);
//!
//!     poller.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod events;
pub mod mock;
pub mod poller;
pub mod retry;
pub mod scan;
pub mod sensor;
pub mod session;
pub mod traits;
pub mod util;

pub use device::{BleResolver, BleTransport};
pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use events::{DeviceEvent, DisconnectReason, EventDispatcher, EventReceiver};
pub use mock::{MockResolver, MockTransport, MockTransportBuilder};
pub use poller::{ConnectionPolicy, Poller, PollerConfig};
pub use retry::{RetryConfig, is_retryable, with_retry};
pub use scan::{DiscoveredDevice, ScanOptions, get_adapter, scan_with_options};
pub use sensor::{PollOutcome, SensorSnapshot};
pub use session::{ConnectionConfig, MAX_TIMEOUT, Session, SessionState};
pub use traits::{Resolver, Transport};

// Re-export from bwt-types
pub use bwt_types::uuid as uuids;
pub use bwt_types::{
    ConnectionStatus, DecodeFallback, Decoded, DeviceAddress, DeviceConfig, Passkey, SaltLevel,
};
