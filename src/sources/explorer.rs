//! Pool-explorer volume collaborator.
//!
//! Fetches each pair's info page data from the explorer endpoint. Figures
//! come back as 7-day display strings (`"$12.3M"`), so they are parsed with
//! the inverse of our own display scaling and divided down to a 24h value.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ExplorerSettings;
use crate::sources::{PoolVolume, VolumeSource};
use crate::utils::parse_scaled;

pub struct ExplorerScraper {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairPage {
    /// 7-day trading volume display string.
    volume7d: String,
    /// 7-day LP fee display string.
    lp_fee7d: String,
}

impl ExplorerScraper {
    pub fn new(settings: &ExplorerSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("building explorer http client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VolumeSource for ExplorerScraper {
    async fn volume_and_fee(&self, pool: &str) -> Result<PoolVolume> {
        let url = format!("{}/{pool}", self.base_url);
        let page: PairPage = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?
            .error_for_status()
            .with_context(|| format!("explorer rejected {pool}"))?
            .json()
            .await
            .with_context(|| format!("decoding explorer page for {pool}"))?;

        let Some(volume_7d) = parse_scaled(&page.volume7d) else {
            bail!("unreadable 7d volume {:?} for {pool}", page.volume7d);
        };
        let Some(fee_7d) = parse_scaled(&page.lp_fee7d) else {
            bail!("unreadable 7d lp fee {:?} for {pool}", page.lp_fee7d);
        };

        Ok(PoolVolume {
            volume_24h: volume_7d / 7.0,
            fee_24h: fee_7d / 7.0,
        })
    }
}
