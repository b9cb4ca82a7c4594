use std::io;

use anyhow::Result;
use bwt_cli::cli::{Cli, Commands, OutputFormat, resolve_format};
use bwt_cli::commands::{
    WatchArgs, cmd_check, cmd_config, cmd_read, cmd_scan, cmd_setup, cmd_watch,
};
use bwt_cli::config::Config;
use bwt_cli::format::FormatOptions;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "bwt", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = Config::path(cli.config.as_deref());
    let opts = FormatOptions::new(cli.no_color);

    match cli.command {
        Commands::Setup {
            address,
            passkey,
            name,
        } => cmd_setup(&address, &passkey, name, &config_path, cli.quiet, &opts),
        Commands::Read { device, format } => {
            let config = Config::load(&config_path);
            cmd_read(&device, resolve_format(format, cli.json), &config, &opts).await
        }
        Commands::Watch {
            device,
            interval,
            count,
            policy,
            format,
        } => {
            let config = Config::load(&config_path);
            cmd_watch(WatchArgs {
                device: &device,
                interval,
                count,
                policy: policy.map(Into::into),
                format: resolve_format(format, cli.json),
                quiet: cli.quiet,
                config: &config,
                opts: &opts,
            })
            .await
        }
        Commands::Check { device } => {
            let config = Config::load(&config_path);
            cmd_check(
                &device,
                resolve_format(OutputFormat::Text, cli.json),
                &config,
                &opts,
            )
            .await
        }
        Commands::Scan {
            timeout,
            all,
            format,
        } => cmd_scan(timeout, all, resolve_format(format, cli.json), cli.quiet, &opts).await,
        Commands::Config { action } => cmd_config(
            action,
            &config_path,
            resolve_format(OutputFormat::Text, cli.json),
        ),
        Commands::Completions { .. } => Ok(()),
    }
}
