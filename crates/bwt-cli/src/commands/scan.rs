//! Scan command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use bwt_core::{ScanOptions, scan_with_options};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_scan_json, format_scan_text};
use crate::util::write_output;

pub async fn cmd_scan(
    timeout: u64,
    all: bool,
    format: OutputFormat,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    if !quiet && format == OutputFormat::Text {
        eprintln!(
            "Scanning for {} ({}s)...",
            if all { "BLE devices" } else { "softeners" },
            timeout
        );
    }

    let options = ScanOptions::new()
        .duration(Duration::from_secs(timeout))
        .filter_bwt_only(!all);
    let devices = scan_with_options(options)
        .await
        .context("Failed to scan for devices")?;

    let content = match format {
        OutputFormat::Json => format_scan_json(&devices)?,
        OutputFormat::Text => format_scan_text(&devices, opts),
    };
    write_output(&content)?;

    if !quiet && format == OutputFormat::Text && devices.iter().any(|d| d.is_bwt) {
        eprintln!("\nTip: save one with 'bwt setup --address <MAC>'");
    }
    Ok(())
}
