//! Trait seams between the poller and the BLE stack.
//!
//! A [`Resolver`] maps a device address to a [`Transport`]; the transport
//! opens, reads and closes the GATT link. The btleplug backend
//! ([`crate::BleResolver`]) and the mock backend ([`crate::MockResolver`])
//! both implement them.

use async_trait::async_trait;
use uuid::Uuid;

use bwt_types::DeviceAddress;

use crate::error::Result;

/// An open-able link to one device.
///
/// Every method takes `&self` so a transport can be shared behind an `Arc`
/// and closed from a different task than the one reading.
///
/// # Example
///
/// ```ignore
/// use bwt_core::{Transport, Result};
/// use bwt_types::uuids::BROADCAST_CHARACTERISTIC;
///
/// async fn raw_level<T: Transport>(transport: &T) -> Result<Vec<u8>> {
///     transport.connect().await?;
///     let data = transport.read(BROADCAST_CHARACTERISTIC).await;
///     transport.disconnect().await;
///     data
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the link. Connecting an already connected transport is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Read a characteristic's current value.
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>>;

    /// Close the link.
    ///
    /// Must be idempotent and must not fail; backend errors are logged.
    async fn disconnect(&self);

    /// Whether the link is currently open.
    async fn is_connected(&self) -> bool;

    /// Identifier of the device behind this transport, for logging.
    fn address(&self) -> String;
}

/// Looks up a reachable device by address.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// The transport handed out for a found device.
    type Transport: Transport + 'static;

    /// Resolve `address` to a transport.
    ///
    /// `Ok(None)` means the device is not currently reachable. `Err` is
    /// reserved for failures of the lookup itself, such as a missing adapter.
    async fn resolve(&self, address: &DeviceAddress) -> Result<Option<Self::Transport>>;
}
