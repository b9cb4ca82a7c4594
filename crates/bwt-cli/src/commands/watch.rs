//! Watch command implementation.
//!
//! Polls on a fixed interval. Under the persistent policy the connection is
//! kept between polls and only re-established after a failure. Ctrl+C shuts
//! the poller down, which cancels an in-flight poll and releases the handle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bwt_core::{ConnectionPolicy, Poller};
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{DeviceArgs, OutputFormat};
use crate::config::{Config, resolve_device};
use crate::format::{FormatOptions, format_event, format_watch_json, format_watch_line};
use crate::util::{open_resolver, write_output};

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub device: &'a DeviceArgs,
    pub interval: u64,
    pub count: u32,
    pub policy: Option<ConnectionPolicy>,
    pub format: OutputFormat,
    pub quiet: bool,
    pub config: &'a Config,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        device,
        interval,
        count,
        policy,
        format,
        quiet,
        config,
        opts,
    } = args;

    let poller_config = config.poller_config(device.timeout, policy)?;
    let device = resolve_device(device, config)?;
    let resolver = open_resolver(config, &poller_config.connection)
        .await
        .context("Failed to open Bluetooth adapter")?;
    let policy = poller_config.policy;
    let poller = Arc::new(Poller::new(resolver, device.clone(), poller_config)?);

    let signal = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nShutting down...");
                poller.shutdown().await;
            }
        })
    };

    // Status transitions go to stderr next to the banner.
    let transitions = (!quiet).then(|| {
        let mut events = poller.subscribe();
        let opts = *opts;
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(line) = format_event(&event, &opts) {
                            eprint!("{}", line);
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    if !quiet {
        let title = device.title();
        if opts.no_color {
            eprintln!("Watching: {}", title);
        } else {
            eprintln!("Watching: {}", title.green());
        }
        let limit = if count > 0 {
            format!(" | Count: {}", count)
        } else {
            String::new()
        };
        eprintln!(
            "Interval: {}s | Policy: {}{} | Press Ctrl+C to stop",
            interval, policy, limit
        );
        eprintln!("{}", "-".repeat(50));
    }

    let mut polls: u32 = 0;
    while !poller.is_shut_down() {
        poller.poll().await;
        if poller.is_shut_down() {
            // Cancelled by Ctrl+C; not a real reading.
            break;
        }

        let snapshot = poller.snapshot().await;
        let line = match format {
            OutputFormat::Json => format_watch_json(&device, &snapshot)?,
            OutputFormat::Text => format_watch_line(&snapshot, opts),
        };
        write_output(&line)?;

        polls += 1;
        if count > 0 && polls >= count {
            if !quiet {
                eprintln!("Completed {} polls.", polls);
            }
            break;
        }

        tokio::select! {
            _ = poller.wait_for_shutdown() => break,
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
        }
    }

    poller.shutdown().await;
    signal.abort();
    if let Some(transitions) = transitions {
        transitions.abort();
    }
    Ok(())
}
