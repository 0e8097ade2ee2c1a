//! Test doubles for the external collaborators

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;
use hopswap_core::{
    Address, Amount, FeeParams, Pool, PoolKind, Reserves, Slippage, Token, TokenRoot,
};

use crate::providers::{
    DirectSwapQuoter, HopQuote, PairDiscovery, PriceImpactEstimator, PriceOracle,
    SlippageComposer,
};
use crate::state::{Bill, Direction, RouteStep};

pub fn pool(
    address: &str,
    left: &str,
    right: &str,
    left_reserve: Amount,
    right_reserve: Amount,
) -> Pool {
    Pool {
        address: Address::new(address),
        left_root: TokenRoot::new(left),
        right_root: TokenRoot::new(right),
        reserves: Reserves {
            left: left_reserve,
            right: right_reserve,
        },
        fee: FeeParams::default(),
        kind: PoolKind::ConstantProduct,
        snapshot: None,
    }
}

pub fn token(root: &str) -> Token {
    Token::new(root, root.to_uppercase(), 0)
}

struct PoolPricing {
    pool: Pool,
    /// receive = spend * num / den when spending the left token
    num: Amount,
    den: Amount,
    fee: String,
}

/// Oracle pricing every pool at a fixed rational rate
#[derive(Default)]
pub struct MockOracle {
    pools: HashMap<Address, PoolPricing>,
    failing: Mutex<HashSet<Address>>,
    failing_refresh: Mutex<HashSet<Address>>,
    quote_calls: AtomicUsize,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: Pool, num: Amount, den: Amount, fee: &str) -> Self {
        self.pools.insert(
            pool.address.clone(),
            PoolPricing {
                pool,
                num,
                den,
                fee: fee.to_string(),
            },
        );
        self
    }

    pub fn fail_quotes_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(Address::new(address));
    }

    pub fn fail_refresh_for(&self, address: &str) {
        self.failing_refresh.lock().unwrap().insert(Address::new(address));
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    fn pricing(&self, address: &Address) -> anyhow::Result<&PoolPricing> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(address) {
            bail!("oracle unavailable for {}", address);
        }
        match self.pools.get(address) {
            Some(p) => Ok(p),
            None => bail!("unknown pool {}", address),
        }
    }

    fn refreshed(&self, address: &Address) -> anyhow::Result<&Pool> {
        if self.failing_refresh.lock().unwrap().contains(address) {
            bail!("state fetch failed for {}", address);
        }
        match self.pools.get(address) {
            Some(p) => Ok(&p.pool),
            None => bail!("unknown pool {}", address),
        }
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn quote_forward(
        &self,
        pool: &Pool,
        spend_root: &TokenRoot,
        spend_amount: Amount,
    ) -> anyhow::Result<HopQuote> {
        let p = self.pricing(&pool.address)?;
        let amount = if spend_root == &p.pool.left_root {
            spend_amount * p.num / p.den
        } else {
            spend_amount * p.den / p.num
        };
        Ok(HopQuote {
            amount,
            fee: p.fee.clone(),
        })
    }

    async fn quote_reverse(
        &self,
        pool: &Pool,
        receive_root: &TokenRoot,
        receive_amount: Amount,
    ) -> anyhow::Result<HopQuote> {
        let p = self.pricing(&pool.address)?;
        let (num, den) = if receive_root == &p.pool.right_root {
            (p.den, p.num)
        } else {
            (p.num, p.den)
        };
        Ok(HopQuote {
            amount: (receive_amount * num).div_ceil(den),
            fee: p.fee.clone(),
        })
    }

    async fn pool_reserves(&self, pool: &Address) -> anyhow::Result<Reserves> {
        Ok(self.refreshed(pool)?.reserves)
    }

    async fn pool_fee_params(&self, pool: &Address) -> anyhow::Result<FeeParams> {
        Ok(self.refreshed(pool)?.fee.clone())
    }

    async fn pool_kind(&self, pool: &Address) -> anyhow::Result<PoolKind> {
        Ok(self.refreshed(pool)?.kind)
    }
}

/// Discovery returning a fixed pool set
pub struct MockDiscovery {
    pub pools: Vec<Pool>,
    pub fail: bool,
}

#[async_trait]
impl PairDiscovery for MockDiscovery {
    async fn find_candidate_pools(
        &self,
        _left: &TokenRoot,
        _right: &TokenRoot,
        _max_hops: usize,
        _min_liquidity_usd: f64,
    ) -> anyhow::Result<Vec<Pool>> {
        if self.fail {
            bail!("indexer offline");
        }
        Ok(self.pools.clone())
    }
}

/// Direct-swap baseline with a fixed bill
pub struct MockDirect {
    pub bill: Option<Bill>,
}

impl MockDirect {
    pub fn expecting(amount: Amount, expected_amount: Amount) -> Self {
        Self {
            bill: Some(Bill {
                amount,
                expected_amount,
                min_expected_amount: expected_amount,
                fee: None,
                price_impact: None,
            }),
        }
    }
}

#[async_trait]
impl DirectSwapQuoter for MockDirect {
    async fn quote_direct(
        &self,
        _left: &TokenRoot,
        _right: &TokenRoot,
        _amount: Amount,
        _direction: Direction,
    ) -> anyhow::Result<Option<Bill>> {
        Ok(self.bill.clone())
    }
}

/// Tolerance grows linearly with hop count
pub struct LinearComposer;

impl SlippageComposer for LinearComposer {
    fn compose(&self, base: Slippage, hop_count: usize) -> Slippage {
        Slippage::from_bps(base.bps() * hop_count as u32)
    }
}

/// Reports the hop count as the impact
pub struct HopCountImpact;

impl PriceImpactEstimator for HopCountImpact {
    fn estimate(&self, steps: &[RouteStep], _base_token: &TokenRoot) -> anyhow::Result<String> {
        Ok(format!("0.{}", steps.len()))
    }
}

/// Scenario pools: X-Y at 0.98, Y-Z at 47/49
pub fn scenario_oracle() -> MockOracle {
    MockOracle::new()
        .with_pool(pool("xy", "x", "y", 100_000, 100_000), 98, 100, "5")
        .with_pool(pool("yz", "y", "z", 100_000, 100_000), 47, 49, "4")
}

pub fn scenario_pools() -> Vec<Pool> {
    vec![
        pool("xy", "x", "y", 100_000, 100_000),
        pool("yz", "y", "z", 100_000, 100_000),
    ]
}
