//! Output formatting for text and JSON output.

use anyhow::Result;
use bwt_core::{
    ConnectionStatus, Decoded, DeviceEvent, DiscoveredDevice, SaltLevel, SensorSnapshot,
};
use bwt_types::DeviceConfig;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Color `text` with `paint` unless colors are disabled.
    fn paint(&self, text: &str, paint: impl Fn(&str) -> String) -> String {
        if self.no_color {
            text.to_string()
        } else {
            paint(text)
        }
    }
}

/// Timestamp in RFC 3339, as used in JSON output and watch lines.
pub fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Colorize a salt level: red at 1, yellow at 2, green above.
fn level_text(level: Option<SaltLevel>, opts: &FormatOptions) -> String {
    match level {
        Some(level) => {
            let text = format!("{}/{}", level, SaltLevel::MAX);
            match level.value() {
                1 => opts.paint(&text, |t| t.red().bold().to_string()),
                2 => opts.paint(&text, |t| t.yellow().to_string()),
                _ => opts.paint(&text, |t| t.green().to_string()),
            }
        }
        None => opts.paint("unavailable", |t| t.dimmed().to_string()),
    }
}

fn status_text(status: ConnectionStatus, opts: &FormatOptions) -> String {
    match status {
        ConnectionStatus::Connected => opts.paint(status.as_str(), |t| t.green().to_string()),
        ConnectionStatus::Initializing => opts.paint(status.as_str(), |t| t.dimmed().to_string()),
        _ => opts.paint(status.as_str(), |t| t.red().to_string()),
    }
}

/// Time of the last poll, or now if none has finished.
fn snapshot_time(snapshot: &SensorSnapshot) -> OffsetDateTime {
    snapshot.updated_at.unwrap_or_else(OffsetDateTime::now_utc)
}

/// Sensor state after a poll, as emitted by `read` and `watch --format json`.
#[derive(Debug, Serialize)]
pub struct ReadingJson<'a> {
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub salt_level: Option<SaltLevel>,
    pub status: ConnectionStatus,
    pub available: bool,
    pub connected: bool,
    pub attribute_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub timestamp: String,
}

impl<'a> ReadingJson<'a> {
    pub fn new(device: &'a DeviceConfig, snapshot: &SensorSnapshot) -> Self {
        Self {
            device: snapshot.device_id.clone(),
            name: device.name.as_deref(),
            salt_level: snapshot.salt_level,
            status: snapshot.status,
            available: snapshot.available,
            connected: snapshot.connected,
            attribute_status: snapshot.attribute_status(),
            fallback: snapshot.fallback.map(|f| f.to_string()),
            timestamp: timestamp(snapshot_time(snapshot)),
        }
    }
}

fn connected_text(connected: bool, opts: &FormatOptions) -> String {
    if connected {
        opts.paint("yes", |t| t.green().to_string())
    } else {
        opts.paint("no", |t| t.red().to_string())
    }
}

/// Format the sensor state as a text block.
pub fn format_reading_text(
    device: &DeviceConfig,
    snapshot: &SensorSnapshot,
    opts: &FormatOptions,
) -> String {
    let mut output = String::new();
    output.push_str(&opts.paint(&device.title(), |t| t.bold().to_string()));
    output.push('\n');
    output.push_str(&format!(
        "  Salt level: {} ({})\n",
        level_text(snapshot.salt_level, opts),
        snapshot.attribute_status()
    ));
    output.push_str(&format!("  Status:     {}\n", status_text(snapshot.status, opts)));
    output.push_str(&format!("  Connected:  {}\n", connected_text(snapshot.connected, opts)));
    if let Some(fallback) = snapshot.fallback {
        output.push_str(&format!(
            "  Note:       {} (default level reported)\n",
            opts.paint(&fallback.to_string(), |t| t.yellow().to_string())
        ));
    }
    output
}

/// Format the sensor state as pretty JSON.
pub fn format_reading_json(device: &DeviceConfig, snapshot: &SensorSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ReadingJson::new(device, snapshot))? + "\n")
}

/// Format one line of `watch` text output.
pub fn format_watch_line(snapshot: &SensorSnapshot, opts: &FormatOptions) -> String {
    let mut line = format!(
        "[{}] salt {}  {}",
        timestamp(snapshot_time(snapshot)),
        level_text(snapshot.salt_level, opts),
        status_text(snapshot.status, opts)
    );
    if let Some(fallback) = snapshot.fallback {
        line.push_str(&format!("  ({})", fallback));
    }
    line.push('\n');
    line
}

/// Format one line of `watch` JSON output (newline-delimited).
pub fn format_watch_json(device: &DeviceConfig, snapshot: &SensorSnapshot) -> Result<String> {
    Ok(serde_json::to_string(&ReadingJson::new(device, snapshot))? + "\n")
}

/// Describe a poller event for the `watch` log, if it is worth showing.
pub fn format_event(event: &DeviceEvent, opts: &FormatOptions) -> Option<String> {
    match event {
        DeviceEvent::StatusChanged { from, to, .. } => Some(format!(
            "Status: {} -> {}\n",
            status_text(*from, opts),
            status_text(*to, opts)
        )),
        _ => None,
    }
}

/// Format the result of `check`.
pub fn format_check_text(
    device: &DeviceConfig,
    raw: &[u8],
    decoded: &Decoded,
    opts: &FormatOptions,
) -> String {
    let mut output = String::new();
    output.push_str(&opts.paint(&device.title(), |t| t.bold().to_string()));
    output.push('\n');
    output.push_str(&format!(
        "  Connection: {}\n",
        opts.paint("ok", |t| t.green().to_string())
    ));
    let hex = if raw.is_empty() {
        "(empty)".to_string()
    } else {
        bwt_core::util::hex(raw)
    };
    output.push_str(&format!("  Broadcast:  {} ({} bytes)\n", hex, raw.len()));
    output.push_str(&format!(
        "  Decoded:    {}",
        level_text(Some(decoded.level), opts)
    ));
    if let Some(fallback) = decoded.fallback {
        output.push_str(&format!(" ({})", fallback));
    }
    output.push('\n');
    output
}

/// A scan result, as emitted by `scan --format json`.
#[derive(Debug, Serialize)]
pub struct ScanJson {
    pub name: Option<String>,
    pub identifier: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub is_bwt: bool,
}

impl From<&DiscoveredDevice> for ScanJson {
    fn from(device: &DiscoveredDevice) -> Self {
        Self {
            name: device.name.clone(),
            identifier: device.identifier(),
            address: device.address.clone(),
            rssi: device.rssi,
            is_bwt: device.is_bwt,
        }
    }
}

/// Format scan results as text.
pub fn format_scan_text(devices: &[DiscoveredDevice], opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return "No softeners found.\n\
                Make sure the device is powered on and in range."
            .to_string()
            + "\n";
    }

    let mut output = format!("Found {} device(s):\n", devices.len());
    for device in devices {
        let name = device.name.as_deref().unwrap_or("Unknown");
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "n/a".to_string());
        let name = if device.is_bwt {
            opts.paint(name, |t| t.green().to_string())
        } else {
            name.to_string()
        };
        output.push_str(&format!(
            "  {:<24} {:<20} {}\n",
            name,
            opts.paint(&device.identifier(), |t| t.cyan().to_string()),
            rssi
        ));
    }
    output
}

/// Format scan results as pretty JSON.
pub fn format_scan_json(devices: &[DiscoveredDevice]) -> Result<String> {
    let entries: Vec<ScanJson> = devices.iter().map(ScanJson::from).collect();
    Ok(serde_json::to_string_pretty(&entries)? + "\n")
}
