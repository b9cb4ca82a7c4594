//! CLI argument definitions using clap.

use std::path::PathBuf;

use bwt_core::ConnectionPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Connection policy as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Connect for each poll and disconnect afterwards
    PerPoll,
    /// Keep one connection open across polls
    Persistent,
}

impl From<PolicyArg> for ConnectionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::PerPoll => ConnectionPolicy::PerPoll,
            PolicyArg::Persistent => ConnectionPolicy::Persistent,
        }
    }
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Softener MAC address, or use BWT_DEVICE env var (defaults to the configured device)
    #[arg(short, long, env = "BWT_DEVICE")]
    pub address: Option<String>,

    /// Pairing passkey, or use BWT_PASSKEY env var (defaults to the configured passkey)
    #[arg(short, long, env = "BWT_PASSKEY", hide_env_values = true)]
    pub passkey: Option<String>,

    /// Connect timeout per attempt in seconds (max 30)
    #[arg(short = 'T', long)]
    pub timeout: Option<u64>,
}

#[derive(Parser)]
#[command(name = "bwt")]
#[command(author, version, about = "CLI for BWT Ultra Compact water softeners", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON (shorthand for --format json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output (any NO_COLOR value other than a false literal)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Path to the configuration file
    #[arg(long, global = true, env = "BWT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and save a softener as the default device
    Setup {
        /// MAC address, e.g. AA:BB:CC:DD:EE:FF
        #[arg(short, long)]
        address: String,

        /// Six-digit pairing passkey
        #[arg(short, long, default_value = bwt_types::DEFAULT_PASSKEY)]
        passkey: String,

        /// Display label for the device
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Poll the softener once and print the salt level
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Poll the softener repeatedly
    Watch {
        #[command(flatten)]
        device: DeviceArgs,

        /// Seconds between polls
        #[arg(short, long, default_value = "30")]
        interval: u64,

        /// Number of polls (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        /// Connection policy (overrides config)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Connect and dump the raw broadcast characteristic
    Check {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Scan for nearby softeners
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,

        /// List all BLE devices, not just softeners
        #[arg(long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Set the default connection policy
    SetPolicy {
        #[arg(value_enum)]
        policy: PolicyArg,
    },
}

/// Resolve the effective output format: `--json` wins over `--format`.
pub fn resolve_format(format: OutputFormat, json: bool) -> OutputFormat {
    if json { OutputFormat::Json } else { format }
}
