//! CLI tool for partitioning datasets and checking partition layouts.
//!
//! Provides commands for:
//! - Range partitioning a dataset on a numeric column
//! - Round-robin partitioning a dataset by row order
//! - Routing inserts into an existing layout
//! - Running the configurable partition test harness

pub mod commands;
pub mod config;
pub mod fixtures;
pub mod harness;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
pub use harness::{HarnessConfig, Report};
