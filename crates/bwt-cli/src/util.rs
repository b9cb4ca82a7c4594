//! Utility functions for CLI operations.

use std::io::{self, Write};

use anyhow::{Context, Result};
use bwt_core::{BleResolver, ConnectionConfig};

use crate::config::Config;

/// Open the first Bluetooth adapter and configure a resolver for it.
pub async fn open_resolver(
    config: &Config,
    connection: &ConnectionConfig,
) -> bwt_core::Result<BleResolver> {
    let mut resolver = BleResolver::first_adapter()
        .await?
        .with_connection_config(connection);
    if let Some(timeout) = config.scan_timeout() {
        resolver = resolver.scan_timeout(timeout);
    }
    Ok(resolver)
}

/// Write to stdout and flush, so piped consumers see each line as it comes.
pub fn write_output(content: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}
