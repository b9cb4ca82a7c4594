//! Poller event system for status and reading notifications.
//!
//! A [`crate::Poller`] publishes events on a tokio broadcast channel, so a
//! front end can follow connectivity without sharing mutable state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use bwt_types::{ConnectionStatus, DecodeFallback, SaltLevel};

/// Events emitted by a poller.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeviceEvent {
    /// The connection status differs from the previous poll's.
    StatusChanged {
        device: String,
        from: ConnectionStatus,
        to: ConnectionStatus,
    },
    /// A poll produced a salt level.
    Reading {
        device: String,
        level: SaltLevel,
        fallback: Option<DecodeFallback>,
    },
    /// A poll failed.
    Error { device: String, error: String },
    /// The session was closed.
    Disconnected {
        device: String,
        reason: DisconnectReason,
    },
}

impl DeviceEvent {
    /// Address of the device the event is about.
    pub fn device(&self) -> &str {
        match self {
            Self::StatusChanged { device, .. }
            | Self::Reading { device, .. }
            | Self::Error { device, .. }
            | Self::Disconnected { device, .. } => device,
        }
    }
}

/// Reason for disconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DisconnectReason {
    /// The poll cycle finished and released the handle.
    PollComplete,
    /// A connect or read failed.
    Failure,
    /// The poller was shut down.
    Shutdown,
}

/// Receiver for device events.
pub type EventReceiver = broadcast::Receiver<DeviceEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: DeviceEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DeviceEvent::StatusChanged {
            device: "AA:BB:CC:DD:EE:FF".into(),
            from: ConnectionStatus::Initializing,
            to: ConnectionStatus::Connected,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"status_changed\""));
        assert!(json.contains("\"to\":\"connected\""));

        let back: DeviceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.device(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_dispatcher_without_receivers() {
        let dispatcher = EventDispatcher::default();
        dispatcher.send(DeviceEvent::Error {
            device: "x".into(),
            error: "boom".into(),
        });
    }

    #[tokio::test]
    async fn test_dispatcher_delivers() {
        let dispatcher = EventDispatcher::new(8);
        let mut rx = dispatcher.subscribe();
        dispatcher.send(DeviceEvent::Disconnected {
            device: "x".into(),
            reason: DisconnectReason::Shutdown,
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            DeviceEvent::Disconnected {
                reason: DisconnectReason::Shutdown,
                ..
            }
        ));
    }
}
