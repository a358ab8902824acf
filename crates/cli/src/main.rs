//! CLI entry point for chord-node.

use clap::Parser;
use cli::{init_logging, CliConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(config.log_level);
    config.run().await
}
