//! Setup command implementation.

use std::path::Path;

use anyhow::{Result, anyhow};
use bwt_types::DeviceConfig;
use owo_colors::OwoColorize;

use crate::config::Config;
use crate::format::FormatOptions;

/// Validate the address and passkey and save them as the default device.
///
/// Validation errors carry the form error code, e.g. `invalid_passkey`.
pub fn cmd_setup(
    address: &str,
    passkey: &str,
    name: Option<String>,
    config_path: &Path,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    let device = DeviceConfig::from_input(address, passkey)
        .map_err(|e| anyhow!("{} [{}]", e, e.code()))?;
    let device = match name {
        Some(name) => device.with_name(name),
        None => device,
    };

    // A broken file is reported rather than overwritten.
    let mut config = Config::try_load(config_path)?;
    config.device = Some(device.clone());
    config.save(config_path)?;

    if !quiet {
        let title = device.title();
        if opts.no_color {
            println!("Saved {}", title);
        } else {
            println!("Saved {}", title.green());
        }
        eprintln!("Config: {}", config_path.display());
    }
    Ok(())
}
