//! BSC JSON-RPC chain collaborator.
//!
//! Reads the farm (MasterChef v2) and its pair/token contracts over HTTP
//! RPC. Pool enumeration is best-effort: a pool whose pair contract or token
//! metadata cannot be read is logged and skipped, never fatal.

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};

use crate::abis::{erc20::IBep20, factory::IFactory, masterchef::IMasterChefV2, pair::IPair};
use crate::config::ChainSettings;
use crate::sources::{ChainSource, MasterChefGlobals, PoolInfo};
use crate::utils::{u256_to_f64, wei_to_f64, TOKEN_DECIMALS};

pub struct BscChain {
    provider: DynProvider,
    masterchef: Address,
    factory: Address,
    usdt: Address,
}

impl BscChain {
    pub fn new(settings: &ChainSettings) -> Result<Self> {
        let url = settings
            .node_url
            .parse()
            .with_context(|| format!("invalid node url {}", settings.node_url))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self {
            provider,
            masterchef: parse_address(&settings.masterchef, "masterchef")?,
            factory: parse_address(&settings.factory, "factory")?,
            usdt: parse_address(&settings.usdt, "usdt")?,
        })
    }

    fn chef(&self) -> IMasterChefV2::IMasterChefV2Instance<DynProvider> {
        IMasterChefV2::new(self.masterchef, self.provider.clone())
    }

    fn pair(&self, address: Address) -> IPair::IPairInstance<DynProvider> {
        IPair::new(address, self.provider.clone())
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        let symbol = IBep20::new(token, self.provider.clone())
            .symbol()
            .call()
            .await?;
        Ok(symbol)
    }

    async fn pool_at(&self, pid: u64) -> Result<PoolInfo> {
        let chef = self.chef();
        let lp_token = chef.lpToken(U256::from(pid)).call().await?;
        let info = chef.poolInfo(U256::from(pid)).call().await?;

        let pair = self.pair(lp_token);
        let token0 = pair.token0().call().await?;
        let token1 = pair.token1().call().await?;
        let token0_symbol = self.token_symbol(token0).await?;
        let token1_symbol = self.token_symbol(token1).await?;

        Ok(PoolInfo {
            index: pid,
            lp_token: format!("{lp_token:#x}"),
            alloc_point: u256_to_f64(info.allocPoint, 0),
            is_regular: info.isRegular,
            token0: format!("{token0:#x}"),
            token0_symbol,
            token1: format!("{token1:#x}"),
            token1_symbol,
        })
    }
}

fn parse_address(value: &str, what: &str) -> Result<Address> {
    value
        .parse()
        .with_context(|| format!("invalid {what} address {value}"))
}

#[async_trait]
impl ChainSource for BscChain {
    async fn enumerate_pools(&self, limit: Option<usize>) -> Result<Vec<PoolInfo>> {
        let length: U256 = self.chef().poolLength().call().await?;
        let mut total = length.to::<u64>();
        if let Some(limit) = limit {
            total = total.min(limit as u64);
        }
        info!("Enumerating {total} farm pools");

        let mut pools = Vec::with_capacity(total as usize);
        for pid in 0..total {
            match self.pool_at(pid).await {
                Ok(pool) => pools.push(pool),
                // Stale or non-pair entries exist in the farm; skip them.
                Err(e) => warn!("Skipping pool {pid}: {e:#}"),
            }
        }
        Ok(pools)
    }

    async fn reserves(&self, pair: &str) -> Result<(f64, f64)> {
        let address = parse_address(pair, "pair")?;
        let r = self.pair(address).getReserves().call().await?;
        Ok((
            u256_to_f64(U256::from(r.reserve0), TOKEN_DECIMALS),
            u256_to_f64(U256::from(r.reserve1), TOKEN_DECIMALS),
        ))
    }

    async fn masterchef_globals(&self) -> Result<MasterChefGlobals> {
        let chef = self.chef();
        let total_regular = chef.totalRegularAllocPoint().call().await?;
        let total_special = chef.totalSpecialAllocPoint().call().await?;
        let regular_per_block = chef.cakePerBlock(true).call().await?;
        let special_per_block = chef.cakePerBlock(false).call().await?;
        Ok(MasterChefGlobals {
            total_regular_alloc: u256_to_f64(total_regular, 0),
            total_special_alloc: u256_to_f64(total_special, 0),
            regular_reward_per_block: wei_to_f64(regular_per_block),
            special_reward_per_block: wei_to_f64(special_per_block),
        })
    }

    async fn token_usd_price(&self, token: &str) -> Result<f64> {
        let token = parse_address(token, "token")?;
        let factory = IFactory::new(self.factory, self.provider.clone());
        let pair = factory.getPair(token, self.usdt).call().await?;
        if pair == Address::ZERO {
            warn!("No USDT pair for token {token:#x}");
            return Ok(0.0);
        }
        let r = self.pair(pair).getReserves().call().await?;
        let reserve0 = u256_to_f64(U256::from(r.reserve0), TOKEN_DECIMALS);
        let reserve1 = u256_to_f64(U256::from(r.reserve1), TOKEN_DECIMALS);
        if reserve0 <= 0.0 || reserve1 <= 0.0 {
            return Ok(0.0);
        }
        // Pair contracts order tokens by address: the USDT side is reserve0
        // exactly when USDT sorts below the token.
        if token > self.usdt {
            Ok(reserve0 / reserve1)
        } else {
            Ok(reserve1 / reserve0)
        }
    }

    async fn lp_supply_and_stake(&self, pair: &str) -> Result<(f64, f64)> {
        let address = parse_address(pair, "pair")?;
        let pair = self.pair(address);
        let supply = pair.totalSupply().call().await?;
        let staked = pair.balanceOf(self.masterchef).call().await?;
        Ok((wei_to_f64(supply), wei_to_f64(staked)))
    }
}
