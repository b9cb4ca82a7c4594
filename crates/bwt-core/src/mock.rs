//! Mock backend for testing.
//!
//! [`MockResolver`] and [`MockTransport`] implement the [`Resolver`] and
//! [`Transport`] traits without BLE hardware.
//!
//! # Features
//!
//! - **Failure injection**: missing devices, connects failing N times,
//!   reads failing N times or always
//! - **Latency simulation**: delays on connect and read (works with paused
//!   tokio time)
//! - **Counters**: connects, reads and disconnects, to assert that handles are
//!   released
//!
//! Transports are cheap handles over shared state: the clone handed out by the
//! resolver and the one kept by a test observe the same counters.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use bwt_types::DeviceAddress;
use bwt_types::uuids::SALT_LEVEL_CHARACTERISTIC;

use crate::error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
use crate::traits::{Resolver, Transport};

const MOCK_ADDRESS: &str = "MOCK:00:00:00:00:00";

#[derive(Debug, Default)]
struct MockState {
    address: String,
    connected: AtomicBool,
    characteristics: RwLock<HashMap<Uuid, Vec<u8>>>,
    connect_count: AtomicU32,
    read_count: AtomicU32,
    disconnect_count: AtomicU32,
    /// Connect attempts still to fail.
    connect_failures: AtomicU32,
    /// Reads still to fail.
    read_failures: AtomicU32,
    /// Fail every read.
    reads_fail: AtomicBool,
    connect_latency_ms: AtomicU64,
    read_latency_ms: AtomicU64,
}

/// A mock GATT link.
///
/// # Example
///
/// ```
/// use bwt_core::{MockTransport, Transport};
/// use bwt_types::uuids::SALT_LEVEL_CHARACTERISTIC;
///
/// #[tokio::main]
/// async fn main() {
///     let transport = MockTransport::builder().payload(vec![4]).build();
///     transport.connect().await.unwrap();
///     let data = transport.read(SALT_LEVEL_CHARACTERISTIC).await.unwrap();
///     assert_eq!(data, vec![4]);
///     transport.disconnect().await;
///     assert_eq!(transport.disconnect_count(), 1);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A transport whose salt level characteristic reads `[3]`.
    pub fn new() -> Self {
        MockTransportBuilder::new().build()
    }

    /// Start building a transport.
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// Replace the salt level payload.
    pub async fn set_payload(&self, payload: Vec<u8>) {
        self.set_characteristic(SALT_LEVEL_CHARACTERISTIC, payload)
            .await;
    }

    /// Replace the value of any characteristic.
    pub async fn set_characteristic(&self, uuid: Uuid, value: Vec<u8>) {
        self.state.characteristics.write().await.insert(uuid, value);
    }

    /// Fail the next `count` connect attempts.
    pub fn set_connect_failures(&self, count: u32) {
        self.state.connect_failures.store(count, Ordering::SeqCst);
    }

    /// Make every read fail (or stop failing).
    pub fn set_reads_fail(&self, fail: bool) {
        self.state.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of connect attempts, failed ones included.
    pub fn connect_count(&self) -> u32 {
        self.state.connect_count.load(Ordering::SeqCst)
    }

    /// Number of read attempts, failed ones included.
    pub fn read_count(&self) -> u32 {
        self.state.read_count.load(Ordering::SeqCst)
    }

    /// Number of disconnect calls that closed an open (or pending) link.
    pub fn disconnect_count(&self) -> u32 {
        self.state.disconnect_count.load(Ordering::SeqCst)
    }

    fn is_connected_sync(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn simulate_latency(millis: &AtomicU64) {
        let latency = millis.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        self.state.connect_count.fetch_add(1, Ordering::SeqCst);
        Self::simulate_latency(&self.state.connect_latency_ms).await;

        if Self::take_failure(&self.state.connect_failures) {
            return Err(Error::connection_failed(
                Some(self.state.address.clone()),
                ConnectionFailureReason::Other("mock connect failure".to_string()),
            ));
        }
        self.state.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        self.state.read_count.fetch_add(1, Ordering::SeqCst);
        if !self.is_connected_sync() {
            return Err(Error::NotConnected);
        }
        Self::simulate_latency(&self.state.read_latency_ms).await;

        if self.state.reads_fail.load(Ordering::SeqCst)
            || Self::take_failure(&self.state.read_failures)
        {
            return Err(Error::read_failed(
                characteristic.to_string(),
                "mock read failure",
            ));
        }

        let characteristics = self.state.characteristics.read().await;
        characteristics
            .get(&characteristic)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(characteristic.to_string(), 1))
    }

    async fn disconnect(&self) {
        // Count only calls that actually close something.
        if self.state.connected.swap(false, Ordering::SeqCst) {
            self.state.disconnect_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn is_connected(&self) -> bool {
        self.is_connected_sync()
    }

    fn address(&self) -> String {
        self.state.address.clone()
    }
}

/// Builder for [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockTransportBuilder {
    address: String,
    characteristics: HashMap<Uuid, Vec<u8>>,
    connect_failures: u32,
    read_failures: u32,
    reads_fail: bool,
    connect_latency: Duration,
    read_latency: Duration,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransportBuilder {
    /// Defaults: salt level characteristic reads `[3]`, nothing fails.
    pub fn new() -> Self {
        let mut characteristics = HashMap::new();
        characteristics.insert(SALT_LEVEL_CHARACTERISTIC, vec![3]);
        Self {
            address: MOCK_ADDRESS.to_string(),
            characteristics,
            connect_failures: 0,
            read_failures: 0,
            reads_fail: false,
            connect_latency: Duration::ZERO,
            read_latency: Duration::ZERO,
        }
    }

    /// Address reported by the transport.
    #[must_use]
    pub fn address(mut self, address: DeviceAddress) -> Self {
        self.address = address.to_string();
        self
    }

    /// Salt level payload.
    #[must_use]
    pub fn payload(self, payload: Vec<u8>) -> Self {
        self.characteristic(SALT_LEVEL_CHARACTERISTIC, payload)
    }

    /// Value of an arbitrary characteristic.
    #[must_use]
    pub fn characteristic(mut self, uuid: Uuid, value: Vec<u8>) -> Self {
        self.characteristics.insert(uuid, value);
        self
    }

    /// Fail the first `count` connect attempts.
    #[must_use]
    pub fn fail_connects(mut self, count: u32) -> Self {
        self.connect_failures = count;
        self
    }

    /// Fail the first `count` reads.
    #[must_use]
    pub fn fail_reads(mut self, count: u32) -> Self {
        self.read_failures = count;
        self
    }

    /// Fail every read.
    #[must_use]
    pub fn reads_fail(mut self) -> Self {
        self.reads_fail = true;
        self
    }

    /// Delay each connect attempt.
    #[must_use]
    pub fn connect_latency(mut self, latency: Duration) -> Self {
        self.connect_latency = latency;
        self
    }

    /// Delay each read.
    #[must_use]
    pub fn read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = latency;
        self
    }

    /// Build the transport.
    pub fn build(self) -> MockTransport {
        MockTransport {
            state: Arc::new(MockState {
                address: self.address,
                characteristics: RwLock::new(self.characteristics),
                connect_failures: AtomicU32::new(self.connect_failures),
                read_failures: AtomicU32::new(self.read_failures),
                reads_fail: AtomicBool::new(self.reads_fail),
                connect_latency_ms: AtomicU64::new(self.connect_latency.as_millis() as u64),
                read_latency_ms: AtomicU64::new(self.read_latency.as_millis() as u64),
                ..Default::default()
            }),
        }
    }
}

/// A mock resolver handing out one shared [`MockTransport`].
#[derive(Debug)]
pub struct MockResolver {
    transport: MockTransport,
    available: AtomicBool,
    no_adapter: AtomicBool,
    resolve_count: AtomicU32,
}

impl MockResolver {
    /// A resolver that finds `transport` for every address.
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            available: AtomicBool::new(true),
            no_adapter: AtomicBool::new(false),
            resolve_count: AtomicU32::new(0),
        }
    }

    /// A resolver that never finds the device.
    pub fn missing() -> Self {
        let resolver = Self::new(MockTransport::new());
        resolver.set_available(false);
        resolver
    }

    /// Toggle whether the device is reachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulate a missing Bluetooth adapter.
    pub fn set_no_adapter(&self, missing: bool) {
        self.no_adapter.store(missing, Ordering::SeqCst);
    }

    /// Handle to the shared transport, for assertions.
    pub fn transport(&self) -> MockTransport {
        self.transport.clone()
    }

    /// Number of resolve calls.
    pub fn resolve_count(&self) -> u32 {
        self.resolve_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    type Transport = MockTransport;

    async fn resolve(&self, _address: &DeviceAddress) -> Result<Option<MockTransport>> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        if self.no_adapter.load(Ordering::SeqCst) {
            return Err(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter));
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(Some(self.transport.clone()))
        } else {
            Ok(None)
        }
    }
}
