//! External collaborators
//!
//! Pool discovery, hop pricing, slippage composition, price impact and the
//! direct-swap baseline all live outside the router. They are injected as
//! trait objects so each component can be exercised against test doubles.

use async_trait::async_trait;
use hopswap_core::{Address, Amount, FeeParams, Pool, PoolKind, Reserves, Slippage, TokenRoot};

use crate::state::{Bill, Direction, RouteStep};

/// Oracle answer for one hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopQuote {
    /// Receive amount for a forward quote, spend amount for a reverse quote
    pub amount: Amount,
    /// Opaque decimal string, passed through unchanged
    pub fee: String,
}

/// Finds pools touching either endpoint
#[async_trait]
pub trait PairDiscovery: Send + Sync {
    async fn find_candidate_pools(
        &self,
        left: &TokenRoot,
        right: &TokenRoot,
        max_hops: usize,
        min_liquidity_usd: f64,
    ) -> anyhow::Result<Vec<Pool>>;
}

/// Per-pool pricing and state
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Expected receive amount and fee for spending `spend_amount` of `spend_root`
    async fn quote_forward(
        &self,
        pool: &Pool,
        spend_root: &TokenRoot,
        spend_amount: Amount,
    ) -> anyhow::Result<HopQuote>;

    /// Required spend amount and fee to receive `receive_amount` of `receive_root`
    async fn quote_reverse(
        &self,
        pool: &Pool,
        receive_root: &TokenRoot,
        receive_amount: Amount,
    ) -> anyhow::Result<HopQuote>;

    async fn pool_reserves(&self, pool: &Address) -> anyhow::Result<Reserves>;

    async fn pool_fee_params(&self, pool: &Address) -> anyhow::Result<FeeParams>;

    async fn pool_kind(&self, pool: &Address) -> anyhow::Result<PoolKind>;
}

/// Widens a per-hop tolerance into a route tolerance
pub trait SlippageComposer: Send + Sync {
    fn compose(&self, base: Slippage, hop_count: usize) -> Slippage;
}

/// Estimates aggregate price impact of a chain of hops
pub trait PriceImpactEstimator: Send + Sync {
    fn estimate(&self, steps: &[RouteStep], base_token: &TokenRoot) -> anyhow::Result<String>;
}

/// Quotes the single-pair swap used as the selection baseline
#[async_trait]
pub trait DirectSwapQuoter: Send + Sync {
    async fn quote_direct(
        &self,
        left: &TokenRoot,
        right: &TokenRoot,
        amount: Amount,
        direction: Direction,
    ) -> anyhow::Result<Option<Bill>>;
}
