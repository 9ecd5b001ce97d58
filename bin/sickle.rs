use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use sickle::{BscChain, ExplorerScraper, LiveMarketData, Screener, Settings};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    let chain = Arc::new(
        BscChain::new(&settings.chain).context("Failed to initialize the chain collaborator")?,
    );
    let explorer = Arc::new(
        ExplorerScraper::new(&settings.explorer)
            .context("Failed to initialize the explorer collaborator")?,
    );
    let market = Arc::new(
        LiveMarketData::new(&settings.market)
            .context("Failed to initialize the market-data collaborator")?,
    );

    let screener = Screener::new(settings, chain, explorer, market)
        .context("Failed to initialize the screener")?;

    info!("Starting daily screener run");
    screener.run().await?;

    Ok(())
}
