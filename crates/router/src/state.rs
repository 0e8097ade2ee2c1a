//! Route State Types
//!
//! Data structures for route candidates, hops, bills and quoted routes.

use std::collections::HashSet;
use std::fmt;

use hopswap_core::{Address, Amount, Pool, RouteError, Slippage, Token, TokenRoot};
use serde::{Deserialize, Serialize};

/// Which side of the exchange the user fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Spend amount known, receive amount quoted
    Forward,
    /// Receive amount known, spend amount quoted
    Reverse,
}

/// One hop through a single pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub spend_root: TokenRoot,
    pub receive_root: TokenRoot,
    pub pool: Address,
    /// Spent on this hop
    pub amount: Amount,
    /// Expected output of this hop
    pub expected_amount: Amount,
    /// Worst acceptable output of this hop
    pub min_expected_amount: Amount,
    /// Fee as reported by the price oracle
    pub fee: String,
}

/// Point-in-time economic summary of a route. Always rebuilt as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bill {
    /// Total spend
    pub amount: Amount,
    /// Expected final receive
    pub expected_amount: Amount,
    /// Worst acceptable final receive
    pub min_expected_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_impact: Option<String>,
}

/// One route computation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub left: Token,
    pub right: Token,
    /// Spend amount for forward requests, receive amount for reverse ones
    pub amount: Amount,
    pub direction: Direction,
    /// Set by the caller once pool depth is known to cover the request.
    /// Until then reverse selection accepts the first usable route.
    #[serde(default)]
    pub is_enough_liquidity: bool,
}

impl RouteRequest {
    pub fn forward(left: Token, right: Token, amount: Amount) -> Self {
        Self {
            left,
            right,
            amount,
            direction: Direction::Forward,
            is_enough_liquidity: true,
        }
    }

    pub fn reverse(left: Token, right: Token, amount: Amount, is_enough_liquidity: bool) -> Self {
        Self {
            left,
            right,
            amount,
            direction: Direction::Reverse,
            is_enough_liquidity,
        }
    }
}

/// Unquoted route skeleton: a simple token chain and the pool for each hop
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    /// `tokens[0]` is the spend token, `tokens[n]` the receive token
    pub tokens: Vec<TokenRoot>,
    /// `pools[i]` trades `tokens[i]` for `tokens[i + 1]`
    pub pools: Vec<Pool>,
}

impl RouteCandidate {
    pub fn hop_count(&self) -> usize {
        self.pools.len()
    }

    /// Tokens strictly between the endpoints
    pub fn intermediate(&self) -> &[TokenRoot] {
        if self.tokens.len() < 2 {
            return &[];
        }
        &self.tokens[1..self.tokens.len() - 1]
    }
}

impl fmt::Display for RouteCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.tokens.iter().map(|t| t.as_str()).collect();
        write!(f, "{}", labels.join(" \u{2192} "))
    }
}

/// Quoted multi-hop route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub direction: Direction,
    pub left_root: TokenRoot,
    pub right_root: TokenRoot,
    pub steps: Vec<RouteStep>,
    pub bill: Bill,
    /// Pool of each hop, in order
    pub pairs: Vec<Address>,
    pub intermediate: Vec<TokenRoot>,
    /// Per-hop tolerance while quoting, composed route tolerance once selected
    pub slippage: Slippage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_left_to_right: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_right_to_left: Option<String>,
}

impl SwapRoute {
    pub fn hop_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Full token chain, endpoints included
    pub fn tokens(&self) -> Vec<&TokenRoot> {
        let mut tokens = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            tokens.push(&first.spend_root);
        }
        tokens.extend(self.steps.iter().map(|s| &s.receive_root));
        tokens
    }

    /// Check structural invariants: non-empty, chained hops matching the
    /// endpoints, no repeated token, and minimums never above expectations.
    pub fn validate(&self) -> Result<(), RouteError> {
        let invalid = |reason: String| Err(RouteError::InvalidRoute { reason });

        let (first, last) = match (self.steps.first(), self.steps.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return invalid("route has no steps".to_string()),
        };
        if first.spend_root != self.left_root {
            return invalid(format!(
                "first hop spends {}, expected {}",
                first.spend_root, self.left_root
            ));
        }
        if last.receive_root != self.right_root {
            return invalid(format!(
                "last hop receives {}, expected {}",
                last.receive_root, self.right_root
            ));
        }
        for (i, pair) in self.steps.windows(2).enumerate() {
            if pair[0].receive_root != pair[1].spend_root {
                return invalid(format!("hop {} does not chain into hop {}", i, i + 1));
            }
        }

        let mut seen = HashSet::new();
        for token in self.tokens() {
            if !seen.insert(token) {
                return invalid(format!("token {} repeats", token));
            }
        }

        if let Some(i) = self
            .steps
            .iter()
            .position(|s| s.min_expected_amount > s.expected_amount)
        {
            return invalid(format!("hop {} minimum exceeds expected amount", i));
        }
        if self.bill.min_expected_amount > self.bill.expected_amount {
            return invalid("bill minimum exceeds expected amount".to_string());
        }
        Ok(())
    }
}
