//! Core type definitions for hopswap

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amount in integer minor units
pub type Amount = u128;

/// Strictly increasing per-account transaction counter
pub type LogicalTime = u64;

/// Token root address (identity of a token on the ledger)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRoot(pub String);

impl TokenRoot {
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account or contract address (wallets, pools)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction ID (hex-encoded hash)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-operation nonce embedded in on-chain payloads and echoed back by
/// every hop callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub u64);

impl CallId {
    /// Generate a fresh random call id
    pub fn generate() -> Self {
        Self((uuid::Uuid::new_v4().as_u128() >> 64) as u64)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Slippage tolerance in basis points (1 bps = 0.01%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slippage(pub u32);

impl Slippage {
    pub const MAX_BPS: u32 = 10_000;

    pub fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// Basis points clamped to 100%
    pub fn clamped_bps(&self) -> u32 {
        self.0.min(Self::MAX_BPS)
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Token with display metadata. Balance is refreshed externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub root: TokenRoot,
    pub decimals: u8,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Amount>,
}

impl Token {
    pub fn new(root: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            root: TokenRoot::new(root),
            decimals,
            symbol: symbol.into(),
            balance: None,
        }
    }
}

/// Pool bonding-curve kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    ConstantProduct,
    Stable,
}

/// Pool fee parameters (opaque to routing, passed to the price oracle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    /// Fee numerator (e.g., 3 for 0.3% with denominator 1000)
    pub numerator: u64,
    pub denominator: u64,
    /// Share of the fee routed to the beneficiary, same denominator
    #[serde(default)]
    pub beneficiary_numerator: u64,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self {
            numerator: 3,
            denominator: 1000,
            beneficiary_numerator: 0,
        }
    }
}

/// Pool reserves, ordered by the pool's left/right roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reserves {
    pub left: Amount,
    pub right: Amount,
}

/// Liquidity pool metadata, refreshed once per route-computation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub left_root: TokenRoot,
    pub right_root: TokenRoot,
    pub reserves: Reserves,
    pub fee: FeeParams,
    pub kind: PoolKind,
    /// Cached contract state as last fetched, opaque to routing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
}

impl Pool {
    /// Whether the pool trades the given token
    pub fn touches(&self, root: &TokenRoot) -> bool {
        &self.left_root == root || &self.right_root == root
    }

    /// The token on the opposite side of `root`, if the pool trades `root`
    pub fn other_side(&self, root: &TokenRoot) -> Option<&TokenRoot> {
        if &self.left_root == root {
            Some(&self.right_root)
        } else if &self.right_root == root {
            Some(&self.left_root)
        } else {
            None
        }
    }

    /// Reserve held for the given token
    pub fn reserve_of(&self, root: &TokenRoot) -> Option<Amount> {
        if &self.left_root == root {
            Some(self.reserves.left)
        } else if &self.right_root == root {
            Some(self.reserves.right)
        } else {
            None
        }
    }

    /// Both reserves are non-zero
    pub fn has_liquidity(&self) -> bool {
        self.reserves.left > 0 && self.reserves.right > 0
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} Pool {} | {}: {} | {}: {}",
            self.kind,
            self.address,
            self.left_root,
            self.reserves.left,
            self.right_root,
            self.reserves.right
        )
    }
}
