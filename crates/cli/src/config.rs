//! Command-line configuration and logging setup.

use crate::commands::Command;
use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Partition a dataset by range or round-robin and check the result.
#[derive(Parser, Debug)]
#[command(name = "partcli", version, about)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set (e.g. `debug`, `partcore=trace`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Executes the selected command and prints its output.
    ///
    /// Fails when the command reports an unsuccessful result, so the process
    /// exits non-zero.
    pub fn run(self) -> anyhow::Result<()> {
        init_tracing(&self.log_level);
        let result = self.command.execute()?;
        println!("{}", result.output);
        if !result.success {
            bail!("{} check(s) failed", result.failures);
        }
        Ok(())
    }
}

/// Installs the global `fmt` subscriber. Later calls are no-ops.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
