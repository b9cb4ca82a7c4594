//! btleplug backend.
//!
//! [`BleResolver`] finds a softener on the first Bluetooth adapter and hands
//! out a [`BleTransport`] for it. Pairing is left to the operating system's
//! Bluetooth agent.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bwt_types::DeviceAddress;

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::scan::{find_peripheral, get_adapter};
use crate::session::ConnectionConfig;
use crate::traits::{Resolver, Transport};

/// Default time spent scanning for a device that is not cached.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// GATT link to one peripheral.
pub struct BleTransport {
    /// Kept alive for as long as the peripheral is in use.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    address: DeviceAddress,
    discovery_timeout: Duration,
    /// Characteristics by UUID, filled after service discovery.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
}

impl fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BleTransport")
            .field("address", &self.address)
            .field("discovery_timeout", &self.discovery_timeout)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Wrap an already discovered peripheral.
    pub fn new(
        adapter: Adapter,
        peripheral: Peripheral,
        address: DeviceAddress,
        discovery_timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            peripheral,
            address,
            discovery_timeout,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    async fn discover(&self) -> Result<()> {
        timeout(self.discovery_timeout, self.peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.discovery_timeout))??;

        let services = self.peripheral.services();
        debug!("Found {} services", services.len());

        let mut cache = self.characteristics.write().await;
        cache.clear();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for characteristic in &service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
                cache.insert(characteristic.uuid, characteristic.clone());
            }
        }
        Ok(())
    }

    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        {
            let cache = self.characteristics.read().await;
            if let Some(characteristic) = cache.get(&uuid) {
                return Ok(characteristic.clone());
            }
            if !cache.is_empty() {
                return Err(Error::characteristic_not_found(
                    uuid.to_string(),
                    self.peripheral.services().len(),
                ));
            }
        }

        warn!(
            "Characteristics cache empty, falling back to service search for {}",
            uuid
        );
        let services = self.peripheral.services();
        services
            .iter()
            .flat_map(|service| service.characteristics.iter())
            .find(|characteristic| characteristic.uuid == uuid)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), services.len()))
    }
}

#[async_trait]
impl Transport for BleTransport {
    #[tracing::instrument(level = "info", skip(self), fields(device = %self.address))]
    async fn connect(&self) -> Result<()> {
        if self.peripheral.is_connected().await.unwrap_or(false) {
            debug!("Already connected");
            return Ok(());
        }

        self.peripheral
            .connect()
            .await
            .map_err(|e| connect_error(&self.address, e))?;
        info!("Link established, discovering services...");
        self.discover().await
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        let target = self.find_characteristic(characteristic).await?;
        self.peripheral
            .read(&target)
            .await
            .map_err(|e| Error::read_failed(characteristic.to_string(), e.to_string()))
    }

    async fn disconnect(&self) {
        self.characteristics.write().await.clear();
        if let Err(e) = self.peripheral.disconnect().await {
            debug!(
                device = %self.address,
                error = %e,
                "Disconnect failed (device may already be disconnected)"
            );
        }
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    fn address(&self) -> String {
        self.address.to_string()
    }
}

/// Classify a failed link attempt for the retry policy.
fn connect_error(address: &DeviceAddress, err: btleplug::Error) -> Error {
    let reason = match err {
        btleplug::Error::TimedOut(_) => ConnectionFailureReason::Timeout,
        btleplug::Error::PermissionDenied => ConnectionFailureReason::AdapterUnavailable,
        other => ConnectionFailureReason::BleError(other.to_string()),
    };
    Error::connection_failed(Some(address.to_string()), reason)
}

/// Resolves addresses to peripherals on one adapter.
#[derive(Clone)]
pub struct BleResolver {
    adapter: Adapter,
    scan_timeout: Duration,
    discovery_timeout: Duration,
}

impl fmt::Debug for BleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BleResolver")
            .field("scan_timeout", &self.scan_timeout)
            .field("discovery_timeout", &self.discovery_timeout)
            .finish_non_exhaustive()
    }
}

impl BleResolver {
    /// Resolver over a given adapter.
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            discovery_timeout: ConnectionConfig::default().discovery_timeout,
        }
    }

    /// Resolver over the first adapter found.
    pub async fn first_adapter() -> Result<Self> {
        Ok(Self::new(get_adapter().await?))
    }

    /// Total scan time spent looking for an uncached device.
    #[must_use]
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Service discovery timeout for transports handed out.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Take the discovery timeout from a connection config.
    #[must_use]
    pub fn with_connection_config(self, config: &ConnectionConfig) -> Self {
        self.discovery_timeout(config.discovery_timeout)
    }
}

#[async_trait]
impl Resolver for BleResolver {
    type Transport = BleTransport;

    async fn resolve(&self, address: &DeviceAddress) -> Result<Option<BleTransport>> {
        let peripheral = find_peripheral(&self.adapter, address, self.scan_timeout).await?;
        Ok(peripheral.map(|peripheral| {
            BleTransport::new(
                self.adapter.clone(),
                peripheral,
                *address,
                self.discovery_timeout,
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::is_retryable;

    fn address() -> DeviceAddress {
        DeviceAddress::parse("AA:BB:CC:DD:EE:FF").unwrap()
    }

    #[test]
    fn test_connect_error_timeout_is_retried() {
        let err = connect_error(&address(), btleplug::Error::TimedOut(Duration::from_secs(5)));
        assert!(matches!(
            &err,
            Error::ConnectionFailed {
                reason: ConnectionFailureReason::Timeout,
                device_id: Some(id),
            } if id == "AA:BB:CC:DD:EE:FF"
        ));
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_connect_error_permission_denied_is_final() {
        let err = connect_error(&address(), btleplug::Error::PermissionDenied);
        assert!(matches!(
            err,
            Error::ConnectionFailed {
                reason: ConnectionFailureReason::AdapterUnavailable,
                ..
            }
        ));
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_connect_error_other_ble_failure() {
        let err = connect_error(&address(), btleplug::Error::DeviceNotFound);
        match &err {
            Error::ConnectionFailed {
                reason: ConnectionFailureReason::BleError(message),
                ..
            } => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(is_retryable(&err));
    }
}
