//! CLI entry point for partcli.

use clap::Parser;
use partcli::CliConfig;

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    config.run()
}
