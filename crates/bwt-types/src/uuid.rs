//! Bluetooth UUIDs for BWT Ultra Compact devices.

use uuid::{Uuid, uuid};

/// BWT custom GATT service.
pub const BWT_SERVICE: Uuid = uuid!("d973f2e0-b19e-11e2-9e96-0800200c9a66");

/// Broadcast characteristic. Carries the salt level as a single byte (1-5).
pub const BROADCAST_CHARACTERISTIC: Uuid = uuid!("d973f2e3-b19e-11e2-9e96-0800200c9a66");

/// Characteristic read for the salt level on every poll.
///
/// Devices seen so far report the level on the broadcast characteristic,
/// so this aliases it. Override it per device through the core's
/// `ConnectionConfig` if a firmware exposes a separate one.
pub const SALT_LEVEL_CHARACTERISTIC: Uuid = BROADCAST_CHARACTERISTIC;
