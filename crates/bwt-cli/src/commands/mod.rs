//! Command implementations for the CLI.

mod check;
mod config;
mod read;
mod scan;
mod setup;
mod watch;

pub use check::cmd_check;
pub use config::cmd_config;
pub use read::cmd_read;
pub use scan::cmd_scan;
pub use setup::cmd_setup;
pub use watch::{WatchArgs, cmd_watch};
