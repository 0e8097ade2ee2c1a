//! Pair registry
//!
//! Discovery answers with whatever the indexer last saw. Before building
//! routes every discovered pool is re-read through the price oracle so
//! reserves, fee parameters and curve kind reflect current pool state.

use std::sync::Arc;

use futures::future::join_all;
use hopswap_core::Pool;

use crate::providers::PriceOracle;

#[derive(Clone)]
pub struct PairRegistry {
    oracle: Arc<dyn PriceOracle>,
}

impl PairRegistry {
    pub fn new(oracle: Arc<dyn PriceOracle>) -> Self {
        Self { oracle }
    }

    /// Refresh pool state concurrently. Pools whose state cannot be read,
    /// or that turn out to be empty, are dropped.
    pub async fn refresh(&self, pools: Vec<Pool>) -> Vec<Pool> {
        let total = pools.len();
        let refreshed: Vec<Pool> = join_all(pools.into_iter().map(|pool| self.refresh_one(pool)))
            .await
            .into_iter()
            .flatten()
            .collect();

        tracing::debug!("Refreshed {}/{} candidate pools", refreshed.len(), total);
        refreshed
    }

    async fn refresh_one(&self, mut pool: Pool) -> Option<Pool> {
        let address = &pool.address;
        let state = futures::try_join!(
            self.oracle.pool_reserves(address),
            self.oracle.pool_fee_params(address),
            self.oracle.pool_kind(address),
        );

        match state {
            Ok((reserves, fee, kind)) => {
                pool.reserves = reserves;
                pool.fee = fee;
                pool.kind = kind;
                if pool.has_liquidity() {
                    Some(pool)
                } else {
                    tracing::debug!("Dropping empty pool {}", pool);
                    None
                }
            }
            Err(e) => {
                tracing::warn!("Dropping pool {}: state unavailable: {:#}", pool.address, e);
                None
            }
        }
    }
}
