//! The `chord-node` binary.
//!
//! Provides commands for:
//! - Running a ring node (`serve`)
//! - Talking to a running node (`client`): blobs, lookups, finger tables, leave

pub mod commands;
pub mod config;
pub mod logging;

pub use config::{CliConfig, Command};
pub use logging::{init_logging, LogLevel};
