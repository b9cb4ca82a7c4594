//! The polling client: one call, one `(value, status)` pair.
//!
//! A [`Poller`] owns the session for one device. Each [`Poller::poll`] runs
//! a full cycle (resolve, connect with retries, read, decode, release) and
//! converts every failure into a [`ConnectionStatus`]. Overlapping polls on
//! the same poller run one at a time.
//!
//! # Example
//!
//! ```
//! use bwt_core::{MockResolver, MockTransport, Poller, PollerConfig};
//! use bwt_types::{ConnectionStatus, DeviceConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let device = DeviceConfig::from_input("AA:BB:CC:DD:EE:FF", "123456").unwrap();
//!     let resolver = MockResolver::new(MockTransport::builder().payload(vec![4]).build());
//!     let poller = Poller::new(resolver, device, PollerConfig::default()).unwrap();
//!
//!     let outcome = poller.poll().await;
//!     assert_eq!(outcome.level.map(|l| l.value()), Some(4));
//!     assert_eq!(outcome.status, ConnectionStatus::Connected);
//! }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use bwt_types::{ConnectionStatus, Decoded, DeviceConfig};

use crate::error::{Error, Result};
use crate::events::{DeviceEvent, DisconnectReason, EventDispatcher, EventReceiver};
use crate::sensor::{PollOutcome, SensorSnapshot};
use crate::session::{ConnectionConfig, Session};
use crate::traits::Resolver;

/// Whether a connection outlives a poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    /// Connect and disconnect on every poll.
    #[default]
    PerPoll,
    /// Keep the session open between polls; drop it on any failure and
    /// reconnect on the next poll.
    Persistent,
}

impl ConnectionPolicy {
    /// Config-file spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerPoll => "per_poll",
            Self::Persistent => "persistent",
        }
    }
}

impl fmt::Display for ConnectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_poll" => Ok(Self::PerPoll),
            "persistent" => Ok(Self::Persistent),
            other => Err(Error::invalid_config(format!(
                "unknown connection policy '{}' (expected per_poll or persistent)",
                other
            ))),
        }
    }
}

/// Settings for a [`Poller`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollerConfig {
    /// Timeouts, retries and characteristic.
    pub connection: ConnectionConfig,
    /// Connection reuse policy.
    pub policy: ConnectionPolicy,
}

impl PollerConfig {
    /// Set the connection config.
    #[must_use]
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Set the connection policy.
    #[must_use]
    pub fn policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Polling client for one softener.
pub struct Poller<R: Resolver> {
    resolver: R,
    device: DeviceConfig,
    config: PollerConfig,
    /// Held for the duration of a poll.
    session: Mutex<Option<Arc<Session<R::Transport>>>>,
    cancel: CancellationToken,
    events: EventDispatcher,
    snapshot: RwLock<SensorSnapshot>,
}

impl<R: Resolver> fmt::Debug for Poller<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("shut_down", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: Resolver> Poller<R> {
    /// Create a poller. Fails only if `config` is invalid.
    pub fn new(resolver: R, device: DeviceConfig, config: PollerConfig) -> Result<Self> {
        config.connection.validate()?;
        let snapshot = SensorSnapshot::initial(device.address.to_string());
        Ok(Self {
            resolver,
            device,
            config,
            session: Mutex::new(None),
            cancel: CancellationToken::new(),
            events: EventDispatcher::default(),
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Run one poll cycle.
    ///
    /// Never fails. Under [`ConnectionPolicy::PerPoll`], and after any
    /// failure, the handle is released before this returns.
    pub async fn poll(&self) -> PollOutcome {
        let mut slot = self.session.lock().await;

        let result = if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Error::Cancelled),
                result = self.cycle(&mut slot) => result,
            }
        };

        let release = result.is_err() || self.config.policy == ConnectionPolicy::PerPoll;
        if release && let Some(session) = slot.take() {
            session.disconnect().await;
            self.events.send(DeviceEvent::Disconnected {
                device: self.device_id(),
                reason: match &result {
                    Ok(_) => DisconnectReason::PollComplete,
                    Err(Error::Cancelled) => DisconnectReason::Shutdown,
                    Err(_) => DisconnectReason::Failure,
                },
            });
        }
        drop(slot);

        let outcome = match result {
            Ok(decoded) => {
                self.events.send(DeviceEvent::Reading {
                    device: self.device_id(),
                    level: decoded.level,
                    fallback: decoded.fallback,
                });
                PollOutcome::connected(decoded.level, decoded.fallback)
            }
            Err(e) => {
                if matches!(e, Error::Cancelled) {
                    info!(device = %self.device.address, "Poll cancelled");
                } else {
                    error!(device = %self.device.address, "Error reading salt level: {}", e);
                }
                self.events.send(DeviceEvent::Error {
                    device: self.device_id(),
                    error: e.to_string(),
                });
                PollOutcome::failed(e.status())
            }
        };

        self.record(&outcome).await;
        outcome
    }

    async fn cycle(&self, slot: &mut Option<Arc<Session<R::Transport>>>) -> Result<Decoded> {
        let reusable = match slot.as_ref() {
            Some(session) if session.is_alive().await => Some(Arc::clone(session)),
            _ => None,
        };

        let session = match reusable {
            Some(session) => session,
            None => {
                if let Some(stale) = slot.take() {
                    stale.disconnect().await;
                }
                let session = Arc::new(
                    Session::resolve(
                        &self.resolver,
                        &self.device.address,
                        self.config.connection.clone(),
                    )
                    .await?,
                );
                // Stored before connecting so a cancelled poll can still release it.
                *slot = Some(Arc::clone(&session));
                session.connect().await?;
                session
            }
        };

        session.read_level().await
    }

    async fn record(&self, outcome: &PollOutcome) {
        let mut snapshot = self.snapshot.write().await;
        let previous = snapshot.status;
        snapshot.apply(outcome, OffsetDateTime::now_utc());
        drop(snapshot);

        if previous != outcome.status {
            self.events.send(DeviceEvent::StatusChanged {
                device: self.device_id(),
                from: previous,
                to: outcome.status,
            });
        }
    }

    /// Tear down any open session and refuse further polls.
    ///
    /// An in-flight poll is cancelled and releases its handle. Safe to call
    /// from another task, and more than once.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.take() {
            session.disconnect().await;
            self.events.send(DeviceEvent::Disconnected {
                device: self.device_id(),
                reason: DisconnectReason::Shutdown,
            });
        }
        info!(device = %self.device.address, "Poller shut down");
    }

    /// Whether [`Poller::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once [`Poller::shutdown`] has been called.
    pub async fn wait_for_shutdown(&self) {
        self.cancel.cancelled().await;
    }

    /// Latest sensor state.
    pub async fn snapshot(&self) -> SensorSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Status of the last poll.
    pub async fn status(&self) -> ConnectionStatus {
        self.snapshot.read().await.status
    }

    /// Subscribe to status and reading events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// The device this poller reads.
    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    /// The poller settings.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// The resolver backing this poller.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn device_id(&self) -> String {
        self.device.address.to_string()
    }
}
