//! Device discovery and scanning.
//!
//! Lists nearby softeners (or all BLE devices) and finds one peripheral by
//! address for [`crate::BleResolver`].

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use bwt_types::DeviceAddress;
use bwt_types::uuids::BWT_SERVICE;

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::util::format_peripheral_id;

/// Scan passes made by [`find_peripheral`] before giving up.
const FIND_ATTEMPTS: u32 = 3;

/// Information about a discovered device.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Advertised local name.
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `id` instead).
    pub address: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the device looks like a BWT softener.
    pub is_bwt: bool,
}

impl DiscoveredDevice {
    /// Address if it is a usable MAC address.
    pub fn device_address(&self) -> Option<DeviceAddress> {
        DeviceAddress::parse(&self.address)
            .ok()
            .filter(|address| address.bytes() != [0; 6])
    }

    /// Identifier to connect with: the MAC address, or the peripheral ID
    /// where the platform hides addresses.
    pub fn identifier(&self) -> String {
        match self.device_address() {
            Some(address) => address.to_string(),
            None => format_peripheral_id(&self.id),
        }
    }
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return devices that appear to be BWT softeners.
    pub filter_bwt_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            filter_bwt_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set whether to filter for BWT devices only.
    #[must_use]
    pub fn filter_bwt_only(mut self, filter: bool) -> Self {
        self.filter_bwt_only = filter;
        self
    }

    /// Scan for all BLE devices.
    #[must_use]
    pub fn all_devices(self) -> Self {
        self.filter_bwt_only(false)
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for devices on the first adapter.
///
/// An empty list means nothing was found; it is not an error.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!("Starting BLE scan for {:?}...", options.duration);

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    let results = join_all(
        peripherals
            .iter()
            .map(|peripheral| process_peripheral(peripheral, options.filter_bwt_only)),
    )
    .await;
    for result in results {
        match result {
            Ok(Some(device)) => {
                debug!("Found device: {:?} ({})", device.name, device.address);
                discovered.push(device);
            }
            Ok(None) => {}
            Err(e) => debug!("Error processing peripheral: {}", e),
        }
    }

    // Strongest signal first.
    discovered.sort_by_key(|d| std::cmp::Reverse(d.rssi.unwrap_or(i16::MIN)));

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

async fn process_peripheral(
    peripheral: &Peripheral,
    filter_bwt_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let is_bwt = is_bwt_device(&properties);
    if filter_bwt_only && !is_bwt {
        return Ok(None);
    }

    Ok(Some(DiscoveredDevice {
        name: properties.local_name.clone(),
        id: peripheral.id(),
        address: properties.address.to_string(),
        rssi: properties.rssi,
        is_bwt,
    }))
}

/// Whether advertised properties look like a BWT softener.
pub(crate) fn is_bwt_device(properties: &PeripheralProperties) -> bool {
    if properties.services.contains(&BWT_SERVICE)
        || properties.service_data.contains_key(&BWT_SERVICE)
    {
        return true;
    }

    properties
        .local_name
        .as_ref()
        .is_some_and(|name| name.to_lowercase().contains("bwt"))
}

/// Find the peripheral with `address`.
///
/// Checks peripherals the adapter already knows, then makes up to three scan
/// passes of growing length that together last `scan_timeout`. Returns `None`
/// when the device never shows up.
pub async fn find_peripheral(
    adapter: &Adapter,
    address: &DeviceAddress,
    scan_timeout: Duration,
) -> Result<Option<Peripheral>> {
    info!(device = %address, "Looking for device");

    if let Some(peripheral) = find_known_peripheral(adapter, address).await? {
        debug!(device = %address, "Found device in cache (no scan needed)");
        return Ok(Some(peripheral));
    }

    for (attempt, scan_duration) in (1..).zip(scan_passes(scan_timeout)) {
        debug!(
            "Scan attempt {}/{} ({:?})...",
            attempt, FIND_ATTEMPTS, scan_duration
        );

        adapter.start_scan(ScanFilter::default()).await?;
        sleep(scan_duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) = find_known_peripheral(adapter, address).await? {
            info!(device = %address, "Found device on attempt {}", attempt);
            return Ok(Some(peripheral));
        }
    }

    warn!(
        device = %address,
        "Device not found after {} scan attempts", FIND_ATTEMPTS
    );
    Ok(None)
}

/// Pass lengths for [`find_peripheral`]: growing as 1:2:3 and summing to at
/// most `scan_timeout`.
fn scan_passes(scan_timeout: Duration) -> impl Iterator<Item = Duration> {
    let base = scan_timeout / (FIND_ATTEMPTS * (FIND_ATTEMPTS + 1) / 2);
    (1..=FIND_ATTEMPTS).map(move |attempt| base * attempt)
}

async fn find_known_peripheral(
    adapter: &Adapter,
    address: &DeviceAddress,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(props)) = peripheral.properties().await
            && address.matches(&props.address.to_string())
        {
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_options() {
        let options = ScanOptions::new();
        assert_eq!(options.duration, Duration::from_secs(5));
        assert!(options.filter_bwt_only);

        let options = ScanOptions::new()
            .duration(Duration::from_secs(12))
            .all_devices();
        assert_eq!(options.duration, Duration::from_secs(12));
        assert!(!options.filter_bwt_only);
    }

    #[test]
    fn test_is_bwt_by_service() {
        let properties = PeripheralProperties {
            services: vec![BWT_SERVICE],
            ..Default::default()
        };
        assert!(is_bwt_device(&properties));
    }

    #[test]
    fn test_is_bwt_by_name() {
        let properties = PeripheralProperties {
            local_name: Some("BWT UC 1234".to_string()),
            ..Default::default()
        };
        assert!(is_bwt_device(&properties));

        let other = PeripheralProperties {
            local_name: Some("Thermo 12345".to_string()),
            ..Default::default()
        };
        assert!(!is_bwt_device(&other));
        assert!(!is_bwt_device(&PeripheralProperties::default()));
    }

    #[test]
    fn test_scan_passes_fit_timeout() {
        let passes: Vec<_> = scan_passes(Duration::from_secs(12)).collect();
        assert_eq!(
            passes,
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(6)]
        );

        let total: Duration = scan_passes(Duration::from_secs(10)).sum();
        assert!(total <= Duration::from_secs(10));
        assert!(total > Duration::from_secs(9));
    }
}
