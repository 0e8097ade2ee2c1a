//! Configuration types for hopswap

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::{Amount, Slippage};

/// Gas attached to a multi-hop message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Fixed cost per hop (native minor units)
    #[serde(default = "default_gas_per_hop")]
    pub per_hop: Amount,

    /// Reserve on top of the per-hop cost so a failed chain can bounce
    #[serde(default = "default_gas_base_reserve")]
    pub base_reserve: Amount,
}

fn default_gas_per_hop() -> Amount {
    600_000_000
}

fn default_gas_base_reserve() -> Amount {
    1_500_000_000
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            per_hop: default_gas_per_hop(),
            base_reserve: default_gas_base_reserve(),
        }
    }
}

impl GasConfig {
    /// Gas to attach for a route of `hop_count` hops
    pub fn attached_for(&self, hop_count: usize) -> Amount {
        self.base_reserve + self.per_hop * hop_count as Amount
    }
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Longest route considered, in hops
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Minimum pool liquidity passed to pair discovery
    #[serde(default = "default_min_liquidity_usd")]
    pub min_liquidity_usd: f64,

    /// Per-hop slippage tolerance
    #[serde(default = "default_base_slippage")]
    pub base_slippage: Slippage,

    #[serde(default)]
    pub gas: GasConfig,

    /// Give up correlating after this many seconds. `None` waits indefinitely.
    #[serde(default)]
    pub correlation_timeout_secs: Option<u64>,

    /// Fractional digits in display prices
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
}

fn default_max_hops() -> usize {
    3
}

fn default_min_liquidity_usd() -> f64 {
    1_000.0
}

fn default_base_slippage() -> Slippage {
    Slippage::from_bps(50)
}

fn default_price_precision() -> u32 {
    8
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            min_liquidity_usd: default_min_liquidity_usd(),
            base_slippage: default_base_slippage(),
            gas: GasConfig::default(),
            correlation_timeout_secs: None,
            price_precision: default_price_precision(),
        }
    }
}

impl RouterConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_hops < 2 {
            return Err(Error::Config(format!(
                "max_hops must be at least 2, got {}",
                self.max_hops
            )));
        }
        if self.base_slippage.bps() > Slippage::MAX_BPS {
            return Err(Error::Config(format!(
                "base_slippage {} exceeds 100%",
                self.base_slippage
            )));
        }
        if self.gas.per_hop == 0 {
            return Err(Error::Config("gas.per_hop must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn correlation_timeout(&self) -> Option<Duration> {
        self.correlation_timeout_secs.map(Duration::from_secs)
    }
}
