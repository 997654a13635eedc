mod app;
mod config;
mod host;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use relay_engine::{JsonFileStorage, Relay, ReqwestFeedSource};
use relay_logging::relay_info;
use tokio::io::BufReader;

use crate::host::StdioHost;
use crate::logging::LogDestination;

#[derive(Parser)]
#[command(name = "term-relay")]
#[command(about = "Relays watch settings and feed headlines between a host and a wearable")]
struct Cli {
    /// RON configuration file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    log: LogDestination,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load(&cli.config)
        .with_context(|| format!("loading configuration from {:?}", cli.config))?;
    logging::initialize(cli.log, config.log_level);

    let host = Arc::new(StdioHost::stdout());
    let storage = JsonFileStorage::open(&config.storage_path);
    let source = Arc::new(ReqwestFeedSource::new(config.fetch_settings()));
    let mut relay = Relay::new(config.relay_config(), host.clone(), Box::new(storage), source);
    relay_info!("Relay started, storage at {:?}", config.storage_path);

    app::run(&mut relay, &host, BufReader::new(tokio::io::stdin()))
        .await
        .context("reading host events")?;
    Ok(())
}
