//! Check command implementation.
//!
//! Connects once and dumps the raw broadcast characteristic, for verifying
//! that the address and pairing work before relying on `read` or `watch`.

use anyhow::{Context, Result};
use bwt_core::{SaltLevel, Session};

use crate::cli::{DeviceArgs, OutputFormat};
use crate::config::{Config, resolve_device};
use crate::format::{FormatOptions, format_check_text};
use crate::util::{open_resolver, write_output};

pub async fn cmd_check(
    args: &DeviceArgs,
    format: OutputFormat,
    config: &Config,
    opts: &FormatOptions,
) -> Result<()> {
    let device = resolve_device(args, config)?;
    let connection = config.connection_config(args.timeout)?;
    let resolver = open_resolver(config, &connection)
        .await
        .context("Failed to open Bluetooth adapter")?;

    let session = Session::establish(&resolver, &device.address, connection)
        .await
        .with_context(|| format!("Failed to connect to {}", device.address))?;
    let probed = session.probe().await;
    session.disconnect().await;
    let raw = probed.context("Failed to read broadcast characteristic")?;

    let decoded = SaltLevel::decode(&raw);
    let content = match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "device": device.address.to_string(),
                "connected": true,
                "raw": bwt_core::util::hex(&raw),
                "salt_level": decoded.level,
                "fallback": decoded.fallback.map(|f| f.to_string()),
            });
            serde_json::to_string_pretty(&value)? + "\n"
        }
        OutputFormat::Text => format_check_text(&device, &raw, &decoded, opts),
    };
    write_output(&content)
}
