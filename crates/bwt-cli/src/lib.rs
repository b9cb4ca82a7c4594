//! Command-line interface for BWT Ultra Compact water softeners.
//!
//! The `bwt` binary polls a softener over Bluetooth Low Energy and reports its
//! salt level (1 to 5) together with a connectivity status.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `setup` | Validate an address and passkey and save them as the default device |
//! | `read` | Poll once and print the salt level |
//! | `watch` | Poll repeatedly until Ctrl+C or `--count` polls |
//! | `check` | Connect and dump the raw broadcast characteristic |
//! | `scan` | Scan for nearby softeners |
//! | `config` | Show the configuration, its path, or set the connection policy |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! The CLI stores configuration in `~/.config/bwt/config.toml` (or platform
//! equivalent), overridable with `--config` or `BWT_CONFIG`:
//!
//! ```toml
//! policy = "per_poll"      # or "persistent"
//! connect_timeout = 10     # seconds per attempt, max 30
//! read_timeout = 10        # seconds, max 30
//!
//! [device]
//! address = "AA:BB:CC:DD:EE:FF"
//! passkey = "123456"
//! name = "Cellar"
//! ```
//!
//! # Environment Variables
//!
//! - `BWT_DEVICE`: Device address (overrides the configured device)
//! - `BWT_PASSKEY`: Pairing passkey
//! - `BWT_CONFIG`: Configuration file path
//! - `NO_COLOR`: Disable colored output when set
//! - `RUST_LOG`: Log filter when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```bash
//! bwt setup --address AA:BB:CC:DD:EE:FF --passkey 123456
//! bwt read
//! bwt watch --interval 60 --policy persistent
//! bwt --json read
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod util;
