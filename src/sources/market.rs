//! Derivatives market-data collaborator.
//!
//! Hedge instruments come from OKX's public tickers (SWAP + FUTURES), with
//! funding rates filled in per perpetual. Volatility history comes from
//! Binance daily klines against USDT. Both are public unauthenticated
//! endpoints; every figure arrives as a string.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::Deserialize;

use crate::config::MarketSettings;
use crate::hedges::{HedgeKind, HedgeQuote, Venue};
use crate::sources::MarketSource;

pub struct LiveMarketData {
    http: reqwest::Client,
    okx_base: String,
    binance_base: String,
}

#[derive(Debug, Deserialize)]
struct OkxEnvelope<T> {
    code: String,
    #[serde(default = "String::new")]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxTicker {
    inst_id: String,
    #[serde(default)]
    bid_px: String,
    #[serde(default)]
    ask_px: String,
    ts: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxFundingRate {
    funding_rate: String,
    next_funding_time: String,
}

/// Splits an OKX instrument id into base currency, instrument kind and
/// delivery date. `ETH-USDT-SWAP` is a perpetual; `ETH-USDT-240628` is a
/// fixed-delivery future expiring on that yymmdd date.
fn parse_instrument(inst_id: &str) -> Option<(String, HedgeKind, Option<NaiveDate>)> {
    let parts: Vec<&str> = inst_id.split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let base = parts[0].to_string();
    if parts[2] == "SWAP" {
        return Some((base, HedgeKind::Perpetual, None));
    }
    let expiry = NaiveDate::parse_from_str(parts[2], "%y%m%d").ok()?;
    Some((base, HedgeKind::Delivery, Some(expiry)))
}

/// Fractional move equal to `num_devs` standard deviations from the rolling
/// mean of the last `lookback` closes. `None` when history is too short or
/// the mean is degenerate.
fn stddev_move(closes: &[f64], lookback: usize, num_devs: f64) -> Option<f64> {
    if lookback < 2 || closes.len() < lookback {
        return None;
    }
    let window = &closes[closes.len() - lookback..];
    let mean = window.iter().sum::<f64>() / lookback as f64;
    if mean <= 0.0 {
        return None;
    }
    // Sample standard deviation (n - 1), matching the volatility estimate
    // the assumptions were calibrated against.
    let variance =
        window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (lookback as f64 - 1.0);
    Some(num_devs * variance.sqrt() / mean)
}

fn millis_to_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value.parse().ok()?)
}

impl LiveMarketData {
    pub fn new(settings: &MarketSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("building market http client")?;
        Ok(Self {
            http,
            okx_base: settings.okx_base_url.trim_end_matches('/').to_string(),
            binance_base: settings.binance_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn okx<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = format!("{}{path}", self.okx_base);
        let envelope: OkxEnvelope<T> = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding {url}"))?;
        if envelope.code != "0" {
            bail!("okx error {} ({}) for {path}", envelope.code, envelope.msg);
        }
        Ok(envelope.data)
    }

    async fn funding_for(&self, inst_id: &str) -> Option<(f64, Option<DateTime<Utc>>)> {
        let rates: Vec<OkxFundingRate> = self
            .okx(&format!("/api/v5/public/funding-rate?instId={inst_id}"))
            .await
            .ok()?;
        let rate = rates.first()?;
        Some((
            rate.funding_rate.parse().ok()?,
            millis_to_utc(&rate.next_funding_time),
        ))
    }

    async fn tickers(&self, inst_type: &str) -> Result<Vec<OkxTicker>> {
        self.okx(&format!("/api/v5/market/tickers?instType={inst_type}"))
            .await
    }

    fn quote_from_ticker(&self, ticker: &OkxTicker) -> Option<HedgeQuote> {
        let (base, kind, expiry) = parse_instrument(&ticker.inst_id)?;
        let timestamp = millis_to_utc(&ticker.ts)?;
        let expiration = expiry.and_then(|d| d.and_hms_opt(8, 0, 0)).map(|dt| dt.and_utc());
        let days_to_expiration =
            expiration.map(|exp| (exp - Utc::now()).num_days());
        Some(HedgeQuote {
            venue: Venue::Okx,
            kind,
            base_currency: base,
            symbol: ticker.inst_id.clone(),
            bid: ticker.bid_px.parse().unwrap_or(0.0),
            ask: ticker.ask_px.parse().unwrap_or(0.0),
            timestamp,
            funding_rate: None,
            next_funding_time: None,
            days_to_expiration,
            expiration,
        })
    }
}

#[async_trait]
impl MarketSource for LiveMarketData {
    async fn active_hedges(&self) -> Result<Vec<HedgeQuote>> {
        let mut quotes = Vec::new();
        for inst_type in ["SWAP", "FUTURES"] {
            for ticker in self.tickers(inst_type).await? {
                if let Some(quote) = self.quote_from_ticker(&ticker) {
                    quotes.push(quote);
                }
            }
        }
        // OKX has no bulk funding endpoint; fill perpetuals one by one and
        // tolerate individual misses.
        for quote in quotes.iter_mut().filter(|q| q.is_perp()) {
            if let Some((rate, next)) = self.funding_for(&quote.symbol).await {
                quote.funding_rate = Some(rate);
                quote.next_funding_time = next;
            }
        }
        info!("Fetched {} hedge instruments from OKX", quotes.len());
        Ok(quotes)
    }

    async fn volatility_move(
        &self,
        asset: &str,
        lookback_days: usize,
        num_devs: f64,
    ) -> Result<f64> {
        let symbol = format!("{}USDT", asset.to_uppercase());
        let url = format!(
            "{}/api/v3/klines?symbol={symbol}&interval=1d&limit=120",
            self.binance_base
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching klines for {symbol}"))?;
        if !response.status().is_success() {
            // Typically an unlisted symbol; the caller degrades the row.
            bail!("no spot market for {symbol} ({})", response.status());
        }
        let candles: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .with_context(|| format!("decoding klines for {symbol}"))?;

        let closes: Vec<f64> = candles
            .iter()
            .filter_map(|candle| candle.get(4)?.as_str()?.parse().ok())
            .collect();
        if closes.len() < candles.len() {
            warn!("Dropped {} unreadable closes for {symbol}", candles.len() - closes.len());
        }

        stddev_move(&closes, lookback_days, num_devs)
            .ok_or_else(|| anyhow!("insufficient close history for {symbol}"))
    }
}
