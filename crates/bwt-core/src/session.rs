//! One connection session to a softener.
//!
//! A [`Session`] owns one transport handle and moves through
//! `disconnected -> connecting -> connected -> reading -> connected ->
//! disconnected`. It is torn down on disconnect or on any failure, and is
//! never reused once disconnected.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bwt_types::uuids::{BROADCAST_CHARACTERISTIC, SALT_LEVEL_CHARACTERISTIC};
use bwt_types::{DeviceAddress, Decoded, SaltLevel};

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::retry::{RetryConfig, is_retryable, with_retry};
use crate::traits::{Resolver, Transport};
use crate::util::hex;

/// Default timeout for one connect attempt.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a characteristic read.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for service discovery after connecting.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound accepted for any single timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeouts, retries and the characteristic a session reads.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bwt_core::{ConnectionConfig, RetryConfig};
///
/// let config = ConnectionConfig::default()
///     .connect_timeout(Duration::from_secs(20))
///     .read_retry(RetryConfig::for_read());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Timeout for each connect attempt.
    pub connect_timeout: Duration,
    /// Timeout for each characteristic read.
    pub read_timeout: Duration,
    /// Timeout for service discovery (used by the btleplug backend).
    pub discovery_timeout: Duration,
    /// Characteristic holding the salt level.
    pub characteristic: Uuid,
    /// Connect retry policy.
    pub connect_retry: RetryConfig,
    /// Read retry policy.
    pub read_retry: RetryConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            characteristic: SALT_LEVEL_CHARACTERISTIC,
            connect_retry: RetryConfig::for_connect(),
            read_retry: RetryConfig::none(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-attempt connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Read the salt level from a different characteristic.
    #[must_use]
    pub fn characteristic(mut self, uuid: Uuid) -> Self {
        self.characteristic = uuid;
        self
    }

    /// Set the connect retry policy.
    #[must_use]
    pub fn connect_retry(mut self, retry: RetryConfig) -> Self {
        self.connect_retry = retry;
        self
    }

    /// Set the read retry policy.
    #[must_use]
    pub fn read_retry(mut self, retry: RetryConfig) -> Self {
        self.read_retry = retry;
        self
    }

    /// Check that every timeout is non-zero and at most [`MAX_TIMEOUT`].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("discovery_timeout", self.discovery_timeout),
        ] {
            if value.is_zero() || value > MAX_TIMEOUT {
                return Err(Error::invalid_config(format!(
                    "{} must be between 1ms and {:?}, got {:?}",
                    name, MAX_TIMEOUT, value
                )));
            }
        }
        Ok(())
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// No open handle.
    Disconnected = 0,
    /// Connect attempts in progress.
    Connecting = 1,
    /// Handle open and idle.
    Connected = 2,
    /// A characteristic read is in flight.
    Reading = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reading,
            _ => Self::Disconnected,
        }
    }
}

/// An exclusive connection to one device.
///
/// All methods take `&self`; wrap the session in an `Arc` to disconnect it
/// from another task.
///
/// # Cleanup
///
/// Call [`Session::disconnect`] when done. A session dropped while still
/// open spawns a best-effort disconnect on the current runtime.
pub struct Session<T: Transport + 'static> {
    transport: Arc<T>,
    address: DeviceAddress,
    state: AtomicU8,
    config: ConnectionConfig,
}

impl<T: Transport + 'static> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: Transport + 'static> Session<T> {
    /// Wrap a transport without opening it.
    pub fn new(transport: T, address: DeviceAddress, config: ConnectionConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            address,
            state: AtomicU8::new(SessionState::Disconnected as u8),
            config,
        }
    }

    /// Resolve `address` into an unopened session.
    ///
    /// A resolver miss is [`Error::DeviceNotFound`]; no transport is opened
    /// and nothing is retried.
    pub async fn resolve<R>(
        resolver: &R,
        address: &DeviceAddress,
        config: ConnectionConfig,
    ) -> Result<Self>
    where
        R: Resolver<Transport = T>,
    {
        match resolver.resolve(address).await? {
            Some(transport) => Ok(Self::new(transport, *address, config)),
            None => {
                warn!(device = %address, "Device not available");
                Err(Error::device_not_found(address.to_string()))
            }
        }
    }

    /// Resolve and connect in one step.
    pub async fn establish<R>(
        resolver: &R,
        address: &DeviceAddress,
        config: ConnectionConfig,
    ) -> Result<Self>
    where
        R: Resolver<Transport = T>,
    {
        let session = Self::resolve(resolver, address, config).await?;
        session.connect().await?;
        Ok(session)
    }

    /// Open the transport, retrying per [`ConnectionConfig::connect_retry`].
    ///
    /// Each attempt is bounded by the connect timeout. On final failure the
    /// transport is closed and the session is left disconnected.
    pub async fn connect(&self) -> Result<()> {
        let state = self.state();
        if matches!(state, SessionState::Connected | SessionState::Reading) {
            return Ok(());
        }
        self.set_state(SessionState::Connecting);
        info!(device = %self.address, "Connecting");

        let connect_timeout = self.config.connect_timeout;
        let result = with_retry(&self.config.connect_retry, "connect", || {
            let transport = Arc::clone(&self.transport);
            async move {
                let attempt = match timeout(connect_timeout, transport.connect()).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout("connect", connect_timeout)),
                };
                if attempt.is_err() {
                    // A timed out attempt may leave a pending link behind.
                    transport.disconnect().await;
                }
                attempt
            }
        })
        .await;

        match result {
            Ok(()) => {
                // Disconnected meanwhile from another task: stay down.
                if self
                    .state
                    .compare_exchange(
                        SessionState::Connecting as u8,
                        SessionState::Connected as u8,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_err()
                {
                    self.transport.disconnect().await;
                    return Err(Error::Cancelled);
                }
                info!(device = %self.address, "Connected");
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Disconnected);
                let attempts = self.config.connect_retry.attempts();
                if is_retryable(&e) && attempts > 1 {
                    Err(Error::connection_failed(
                        Some(self.address.to_string()),
                        ConnectionFailureReason::RetriesExhausted {
                            attempts,
                            last_error: e.to_string(),
                        },
                    ))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Read and decode the salt level.
    ///
    /// Empty or out-of-range payloads decode to the default level and are
    /// logged as warnings; only transport failures are errors.
    pub async fn read_level(&self) -> Result<Decoded> {
        let data = self.read_raw(self.config.characteristic).await?;
        let decoded = SaltLevel::decode(&data);
        match decoded.fallback {
            Some(reason) => warn!(
                device = %self.address,
                payload = %hex(&data),
                "Using default salt level {}: {}",
                decoded.level,
                reason
            ),
            None => debug!(device = %self.address, level = %decoded.level, "Salt level decoded"),
        }
        Ok(decoded)
    }

    /// Connectivity test: read the broadcast characteristic and return the
    /// raw payload.
    pub async fn probe(&self) -> Result<Vec<u8>> {
        let data = self.read_raw(BROADCAST_CHARACTERISTIC).await?;
        info!(device = %self.address, payload = %hex(&data), "Probe succeeded");
        Ok(data)
    }

    async fn read_raw(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        if self
            .state
            .compare_exchange(
                SessionState::Connected as u8,
                SessionState::Reading as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(Error::NotConnected);
        }

        let read_timeout = self.config.read_timeout;
        let result = with_retry(&self.config.read_retry, "read", || {
            let transport = Arc::clone(&self.transport);
            async move {
                match timeout(read_timeout, transport.read(characteristic)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout(
                        format!("read characteristic {}", characteristic),
                        read_timeout,
                    )),
                }
            }
        })
        .await;

        // Leave Disconnected alone if another task closed us mid-read.
        let _ = self.state.compare_exchange(
            SessionState::Reading as u8,
            SessionState::Connected as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        let data = result?;
        debug!(device = %self.address, payload = %hex(&data), "Raw BLE data received");
        Ok(data)
    }

    /// Close the transport.
    ///
    /// Idempotent and infallible. Safe to call from any task, including
    /// while another task is connecting or reading.
    pub async fn disconnect(&self) {
        let previous = SessionState::from_u8(
            self.state
                .swap(SessionState::Disconnected as u8, Ordering::SeqCst),
        );
        if previous != SessionState::Disconnected {
            self.transport.disconnect().await;
            info!(device = %self.address, "Disconnected");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the session is open and the transport still reports a link.
    pub async fn is_alive(&self) -> bool {
        matches!(self.state(), SessionState::Connected) && self.transport.is_connected().await
    }

    /// Address of the device.
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

impl<T: Transport + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        if self.state() == SessionState::Disconnected {
            return;
        }
        self.set_state(SessionState::Disconnected);

        warn!(
            device = %self.address,
            "Session dropped without disconnect() - performing best-effort cleanup"
        );

        let transport = Arc::clone(&self.transport);
        let address = self.address;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                transport.disconnect().await;
                debug!(device = %address, "Best-effort disconnect completed");
            });
        } else {
            debug!(device = %address, "No runtime available for best-effort disconnect");
        }
    }
}
