use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::utils::SuffixOrder;

/// Daily snapshot persistence and rolling-average configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Width of the trailing window used for smoothed metrics, in days.
    #[serde(default = "default_average_window_days")]
    pub average_window_days: usize,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_average_window_days() -> usize {
    6
}

/// Hypothetical deposit sizes the screener evaluates, in USD.
///
/// Every yield and cost metric is computed once per tier, because adding
/// the deposit to a pool dilutes that pool's returns.
#[derive(Debug, Deserialize, Clone)]
pub struct BalanceSettings {
    pub tiers: Vec<f64>,
}

/// Debug-run configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DebugSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Number of farm pools to process when debugging.
    #[serde(default = "default_pool_limit")]
    pub pool_limit: usize,
}

fn default_pool_limit() -> usize {
    10
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            pool_limit: default_pool_limit(),
        }
    }
}

/// Trading-fee assumptions applied to hedge legs.
#[derive(Debug, Deserialize, Clone)]
pub struct FeeSettings {
    /// Quote hedge costs at maker rather than taker rates.
    #[serde(default = "default_maker")]
    pub maker: bool,
    /// Round-trip exchange fee applied per hedge notional, in percent.
    #[serde(default = "default_exchange_fee_pct")]
    pub exchange_fee_pct: f64,
}

fn default_maker() -> bool {
    true
}

fn default_exchange_fee_pct() -> f64 {
    0.17
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            maker: default_maker(),
            exchange_fee_pct: default_exchange_fee_pct(),
        }
    }
}

/// Impermanent-loss scenario configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ImpermanentLossSettings {
    /// Days of close history the volatility estimate looks back over.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,
    /// How many standard deviations the adverse move scenario assumes.
    #[serde(default = "default_std_devs")]
    pub std_devs: f64,
}

fn default_lookback_days() -> usize {
    50
}

fn default_std_devs() -> f64 {
    2.0
}

impl Default for ImpermanentLossSettings {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            std_devs: default_std_devs(),
        }
    }
}

/// Display-string formatting configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct FormatterSettings {
    /// Keep the legacy suffix precedence where the thousands rule wins
    /// over millions and billions. Disable for magnitude ordering.
    #[serde(default = "default_legacy_suffix_order")]
    pub legacy_suffix_order: bool,
}

fn default_legacy_suffix_order() -> bool {
    true
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            legacy_suffix_order: default_legacy_suffix_order(),
        }
    }
}

impl FormatterSettings {
    pub fn suffix_order(&self) -> SuffixOrder {
        if self.legacy_suffix_order {
            SuffixOrder::Legacy
        } else {
            SuffixOrder::Magnitude
        }
    }
}

/// BSC node and farm contract configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    pub node_url: String,
    pub masterchef: String,
    pub factory: String,
    pub usdt: String,
    /// Reward token the farm emits (CAKE).
    pub platform_token: String,
}

/// Pool-explorer endpoint configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ExplorerSettings {
    pub base_url: String,
}

/// Derivatives market-data endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct MarketSettings {
    #[serde(default = "default_okx_base_url")]
    pub okx_base_url: String,
    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,
}

fn default_okx_base_url() -> String {
    "https://www.okx.com".to_string()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            okx_base_url: default_okx_base_url(),
            binance_base_url: default_binance_base_url(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub snapshots: SnapshotSettings,
    pub balances: BalanceSettings,
    pub chain: ChainSettings,
    pub explorer: ExplorerSettings,
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub debug: DebugSettings,
    #[serde(default)]
    pub fees: FeeSettings,
    #[serde(default)]
    pub impermanent_loss: ImpermanentLossSettings,
    #[serde(default)]
    pub formatter: FormatterSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }

    /// Pool count cap for a run, when debugging is on.
    pub fn pool_limit(&self) -> Option<usize> {
        self.debug.enabled.then_some(self.debug.pool_limit)
    }
}
