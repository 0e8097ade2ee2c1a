//! Quote Engine: per-hop amount propagation
//!
//! Forward fill walks left to right from a known spend amount. Reverse fill
//! walks right to left from a known receive amount: nominal spends first,
//! then the minimum chain in a second pass. Every hop is priced by the
//! external oracle; a failing hop disqualifies only its own candidate.

use std::sync::Arc;

use futures::future::join_all;
use hopswap_core::{Amount, Pool, RouteError, Slippage, TokenRoot};

use crate::calculator::apply_slippage;
use crate::providers::{HopQuote, PriceImpactEstimator, PriceOracle};
use crate::state::{Bill, Direction, RouteCandidate, RouteStep, SwapRoute};

/// Drives the price oracle over route candidates
#[derive(Clone)]
pub struct QuoteEngine {
    oracle: Arc<dyn PriceOracle>,
    impact: Arc<dyn PriceImpactEstimator>,
}

impl QuoteEngine {
    pub fn new(oracle: Arc<dyn PriceOracle>, impact: Arc<dyn PriceImpactEstimator>) -> Self {
        Self { oracle, impact }
    }

    /// Quote one candidate in the given direction
    pub async fn fill(
        &self,
        candidate: &RouteCandidate,
        direction: Direction,
        amount: Amount,
        slippage: Slippage,
    ) -> Result<SwapRoute, RouteError> {
        match direction {
            Direction::Forward => self.forward_fill(candidate, amount, slippage).await,
            Direction::Reverse => self.reverse_fill(candidate, amount, slippage).await,
        }
    }

    /// Quote every candidate concurrently. Candidates whose quote fails are
    /// dropped; the others are returned in candidate order.
    pub async fn quote_all(
        &self,
        candidates: &[RouteCandidate],
        direction: Direction,
        amount: Amount,
        slippage: Slippage,
    ) -> Vec<SwapRoute> {
        let results = join_all(
            candidates
                .iter()
                .map(|candidate| self.fill(candidate, direction, amount, slippage)),
        )
        .await;

        candidates
            .iter()
            .zip(results)
            .filter_map(|(candidate, result)| match result {
                Ok(route) => Some(route),
                Err(e) => {
                    tracing::warn!("Discarding candidate {}: {}", candidate, e);
                    None
                }
            })
            .collect()
    }

    /// Spend amount known. The nominal chain feeds each hop's expected
    /// output into the next hop; alongside it, the minimum chain feeds each
    /// hop's slippage-adjusted minimum into the next hop, so the worst case
    /// is bounded at every hop.
    pub async fn forward_fill(
        &self,
        candidate: &RouteCandidate,
        spend_amount: Amount,
        slippage: Slippage,
    ) -> Result<SwapRoute, RouteError> {
        check_inputs(candidate, spend_amount)?;

        let mut steps = Vec::with_capacity(candidate.hop_count());
        let mut spend = spend_amount;
        let mut min_spend = spend_amount;

        for (hop, pool) in candidate.pools.iter().enumerate() {
            let spend_root = &candidate.tokens[hop];

            let (expected, worst) = if min_spend == spend {
                let quote = self.quote_forward(hop, pool, spend_root, spend).await?;
                let worst = quote.amount;
                (quote, worst)
            } else {
                let (quote, worst) = futures::try_join!(
                    self.quote_forward(hop, pool, spend_root, spend),
                    self.quote_forward(hop, pool, spend_root, min_spend),
                )?;
                (quote, worst.amount)
            };

            if expected.amount == 0 {
                return Err(zero_output(hop, pool));
            }
            let min_expected = apply_slippage(worst, slippage).min(expected.amount);

            steps.push(RouteStep {
                spend_root: spend_root.clone(),
                receive_root: candidate.tokens[hop + 1].clone(),
                pool: pool.address.clone(),
                amount: spend,
                expected_amount: expected.amount,
                min_expected_amount: min_expected,
                fee: expected.fee,
            });

            spend = expected.amount;
            min_spend = min_expected;
        }

        Ok(self.assemble(candidate, Direction::Forward, steps, slippage))
    }

    /// Receive amount known. The first right-to-left pass sizes the nominal
    /// spend of every hop without any slippage; the second right-to-left pass
    /// derives the minimum chain from the final minimum.
    pub async fn reverse_fill(
        &self,
        candidate: &RouteCandidate,
        receive_amount: Amount,
        slippage: Slippage,
    ) -> Result<SwapRoute, RouteError> {
        check_inputs(candidate, receive_amount)?;
        let hops = candidate.hop_count();

        // Pass 1: nominal sizing
        let mut nominal: Vec<(Amount, Amount, String)> = vec![(0, 0, String::new()); hops];
        let mut needed = receive_amount;
        for hop in (0..hops).rev() {
            let pool = &candidate.pools[hop];
            let quote = self
                .quote_reverse(hop, pool, &candidate.tokens[hop + 1], needed)
                .await?;
            if quote.amount == 0 {
                return Err(zero_output(hop, pool));
            }
            nominal[hop] = (quote.amount, needed, quote.fee);
            needed = quote.amount;
        }

        // Pass 2: minimum chain. Slippage applies once, to the final output;
        // every upstream minimum is the spend the next hop needs to still
        // reach its own minimum.
        let mut minimums: Vec<Amount> = vec![0; hops];
        let mut min_receive = apply_slippage(receive_amount, slippage);
        for hop in (0..hops).rev() {
            minimums[hop] = min_receive.min(nominal[hop].1);
            if hop > 0 {
                let pool = &candidate.pools[hop];
                let upstream = self
                    .quote_reverse(hop, pool, &candidate.tokens[hop + 1], minimums[hop])
                    .await?;
                min_receive = upstream.amount;
            }
        }

        let steps = nominal
            .into_iter()
            .zip(minimums)
            .enumerate()
            .map(|(hop, ((spend, receive, fee), min_expected))| RouteStep {
                spend_root: candidate.tokens[hop].clone(),
                receive_root: candidate.tokens[hop + 1].clone(),
                pool: candidate.pools[hop].address.clone(),
                amount: spend,
                expected_amount: receive,
                min_expected_amount: min_expected,
                fee,
            })
            .collect();

        Ok(self.assemble(candidate, Direction::Reverse, steps, slippage))
    }

    /// Build the route and its bill from scratch out of the filled steps.
    fn assemble(
        &self,
        candidate: &RouteCandidate,
        direction: Direction,
        steps: Vec<RouteStep>,
        slippage: Slippage,
    ) -> SwapRoute {
        let left_root = candidate.tokens[0].clone();
        let right_root = candidate.tokens[candidate.tokens.len() - 1].clone();

        let price_impact = match self.impact.estimate(&steps, &left_root) {
            Ok(impact) => Some(impact),
            Err(e) => {
                tracing::warn!("Price impact unavailable for {}: {:#}", candidate, e);
                None
            }
        };

        let first = &steps[0];
        let last = &steps[steps.len() - 1];
        let bill = Bill {
            amount: first.amount,
            expected_amount: last.expected_amount,
            min_expected_amount: last.min_expected_amount,
            fee: Some(first.fee.clone()),
            price_impact,
        };

        tracing::debug!(
            "Quoted {} ({:?}): {} -> {} (min {})",
            candidate,
            direction,
            bill.amount,
            bill.expected_amount,
            bill.min_expected_amount
        );

        SwapRoute {
            direction,
            left_root,
            right_root,
            pairs: candidate.pools.iter().map(|p| p.address.clone()).collect(),
            intermediate: candidate.intermediate().to_vec(),
            steps,
            bill,
            slippage,
            price_left_to_right: None,
            price_right_to_left: None,
        }
    }

    async fn quote_forward(
        &self,
        hop: usize,
        pool: &Pool,
        spend_root: &TokenRoot,
        amount: Amount,
    ) -> Result<HopQuote, RouteError> {
        self.oracle
            .quote_forward(pool, spend_root, amount)
            .await
            .map_err(|e| quote_failure(hop, pool, e))
    }

    async fn quote_reverse(
        &self,
        hop: usize,
        pool: &Pool,
        receive_root: &TokenRoot,
        amount: Amount,
    ) -> Result<HopQuote, RouteError> {
        self.oracle
            .quote_reverse(pool, receive_root, amount)
            .await
            .map_err(|e| quote_failure(hop, pool, e))
    }
}

fn check_inputs(candidate: &RouteCandidate, amount: Amount) -> Result<(), RouteError> {
    if candidate.hop_count() == 0 || candidate.tokens.len() != candidate.hop_count() + 1 {
        return Err(RouteError::InvalidRoute {
            reason: format!("malformed candidate {}", candidate),
        });
    }
    if amount == 0 {
        return Err(RouteError::InvalidAmount {
            message: "amount must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn quote_failure(hop: usize, pool: &Pool, err: anyhow::Error) -> RouteError {
    RouteError::QuoteFailure {
        hop,
        pool: pool.address.to_string(),
        reason: format!("{:#}", err),
    }
}

fn zero_output(hop: usize, pool: &Pool) -> RouteError {
    RouteError::QuoteFailure {
        hop,
        pool: pool.address.to_string(),
        reason: "insufficient liquidity: zero amount".to_string(),
    }
}
