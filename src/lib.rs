pub mod abis;
pub mod config;
pub mod error;
pub mod hedges;
pub mod pipeline;
pub mod screener;
pub mod sources;
pub mod store;
pub mod table;
pub mod utils;

pub use config::Settings;
pub use error::ScreenerError;
pub use screener::Screener;
pub use sources::{BscChain, ExplorerScraper, LiveMarketData};
pub use table::MetricsTable;
