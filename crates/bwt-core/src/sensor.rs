//! Poll outcomes and the sensor view derived from them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use bwt_types::{ConnectionStatus, DecodeFallback, SaltLevel};

/// Result of one poll cycle. Never an error.
///
/// | Failure | level | status |
/// |---------|-------|--------|
/// | resolver miss | `None` | `device_not_found` |
/// | connect failure after retries | `None` | `connection_error` |
/// | read failure or timeout | `None` | `connection_error` |
/// | empty or out-of-range payload | `Some(3)` | `connected` |
/// | success | `Some(b)` | `connected` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutcome {
    /// The salt level, when the read succeeded.
    pub level: Option<SaltLevel>,
    /// Connectivity status of this poll.
    pub status: ConnectionStatus,
    /// Set when `level` is the default substituted for a bad payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<DecodeFallback>,
}

impl PollOutcome {
    /// A successful poll.
    pub fn connected(level: SaltLevel, fallback: Option<DecodeFallback>) -> Self {
        Self {
            level: Some(level),
            status: ConnectionStatus::Connected,
            fallback,
        }
    }

    /// A failed poll.
    pub fn failed(status: ConnectionStatus) -> Self {
        Self {
            level: None,
            status,
            fallback: None,
        }
    }

    /// Whether a level is present.
    pub fn is_available(&self) -> bool {
        self.level.is_some()
    }
}

/// Latest state of one softener, as a front end displays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Address of the softener.
    pub device_id: String,
    /// Last salt level; `None` after a failed poll.
    pub salt_level: Option<SaltLevel>,
    /// Status of the last poll.
    pub status: ConnectionStatus,
    /// True iff `salt_level` is present.
    pub available: bool,
    /// True iff `status` is `connected`.
    pub connected: bool,
    /// Set when `salt_level` is the default substituted for a bad payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<DecodeFallback>,
    /// When the last poll finished.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl SensorSnapshot {
    /// State before the first poll: the default level, status `initializing`.
    pub fn initial(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            salt_level: Some(SaltLevel::DEFAULT),
            status: ConnectionStatus::Initializing,
            available: true,
            connected: false,
            fallback: None,
            updated_at: None,
        }
    }

    /// Overwrite with the result of a poll.
    pub fn apply(&mut self, outcome: &PollOutcome, at: OffsetDateTime) {
        self.salt_level = outcome.level;
        self.status = outcome.status;
        self.available = outcome.is_available();
        self.connected = outcome.status.is_connected();
        self.fallback = outcome.fallback;
        self.updated_at = Some(at);
    }

    /// `"active"` while a level is present, `"error"` otherwise.
    pub fn attribute_status(&self) -> &'static str {
        if self.salt_level.is_some() {
            "active"
        } else {
            "error"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let snapshot = SensorSnapshot::initial("AA:BB:CC:DD:EE:FF");
        assert_eq!(snapshot.salt_level, Some(SaltLevel::DEFAULT));
        assert_eq!(snapshot.status, ConnectionStatus::Initializing);
        assert!(snapshot.available);
        assert!(!snapshot.connected);
        assert_eq!(snapshot.attribute_status(), "active");
    }

    #[test]
    fn test_apply_failure_clears_level() {
        let mut snapshot = SensorSnapshot::initial("x");
        let now = OffsetDateTime::now_utc();
        snapshot.apply(&PollOutcome::failed(ConnectionStatus::DeviceNotFound), now);
        assert_eq!(snapshot.salt_level, None);
        assert!(!snapshot.available);
        assert!(!snapshot.connected);
        assert_eq!(snapshot.attribute_status(), "error");
        assert_eq!(snapshot.updated_at, Some(now));
    }

    #[test]
    fn test_apply_success() {
        let mut snapshot = SensorSnapshot::initial("x");
        let level = SaltLevel::new(4).unwrap();
        snapshot.apply(
            &PollOutcome::connected(level, None),
            OffsetDateTime::now_utc(),
        );
        assert_eq!(snapshot.salt_level, Some(level));
        assert!(snapshot.available);
        assert!(snapshot.connected);
        assert!(snapshot.fallback.is_none());
    }

    #[test]
    fn test_apply_keeps_fallback_until_next_poll() {
        let mut snapshot = SensorSnapshot::initial("x");
        let now = OffsetDateTime::now_utc();
        snapshot.apply(
            &PollOutcome::connected(SaltLevel::DEFAULT, Some(DecodeFallback::Empty)),
            now,
        );
        assert_eq!(snapshot.fallback, Some(DecodeFallback::Empty));
        snapshot.apply(&PollOutcome::failed(ConnectionStatus::ConnectionError), now);
        assert!(snapshot.fallback.is_none());
    }

    #[test]
    fn test_outcome_json() {
        let outcome = PollOutcome::connected(SaltLevel::DEFAULT, Some(DecodeFallback::Empty));
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["level"], 3);
        assert_eq!(json["status"], "connected");
        assert_eq!(json["fallback"]["reason"], "empty");

        let failed = serde_json::to_value(PollOutcome::failed(ConnectionStatus::ConnectionError))
            .unwrap();
        assert!(failed["level"].is_null());
        assert!(failed.get("fallback").is_none());
    }

    #[test]
    fn test_snapshot_json_timestamp() {
        let mut snapshot = SensorSnapshot::initial("x");
        snapshot.apply(
            &PollOutcome::failed(ConnectionStatus::ConnectionError),
            OffsetDateTime::UNIX_EPOCH,
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["updated_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["status"], "connection_error");
    }
}
