//! Read command implementation.

use anyhow::Result;
use bwt_core::{PollOutcome, Poller, SensorSnapshot};
use time::OffsetDateTime;
use tracing::warn;

use crate::cli::{DeviceArgs, OutputFormat};
use crate::config::{Config, resolve_device};
use crate::format::{FormatOptions, format_reading_json, format_reading_text};
use crate::util::{open_resolver, write_output};

/// Run one poll cycle and print the resulting sensor state.
///
/// An unavailable device is a result, not an error: the exit status stays 0.
pub async fn cmd_read(
    args: &DeviceArgs,
    format: OutputFormat,
    config: &Config,
    opts: &FormatOptions,
) -> Result<()> {
    let device = resolve_device(args, config)?;
    let poller_config = config.poller_config(args.timeout, None)?;

    let snapshot = match open_resolver(config, &poller_config.connection).await {
        Ok(resolver) => {
            let poller = Poller::new(resolver, device.clone(), poller_config)?;
            poller.poll().await;
            poller.shutdown().await;
            poller.snapshot().await
        }
        Err(e) => {
            warn!("Bluetooth unavailable: {}", e);
            let mut snapshot = SensorSnapshot::initial(device.address.to_string());
            snapshot.apply(&PollOutcome::failed(e.status()), OffsetDateTime::now_utc());
            snapshot
        }
    };

    let content = match format {
        OutputFormat::Json => format_reading_json(&device, &snapshot)?,
        OutputFormat::Text => format_reading_text(&device, &snapshot, opts),
    };
    write_output(&content)
}
