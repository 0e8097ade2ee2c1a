//! hopswap-router: Multi-hop AMM routing
//!
//! Finds cross-pair routes through an intermediate token when they beat a
//! direct swap, and follows their execution on the ledger.
//!
//! # Components
//!
//! - [`builder`]: route skeletons from the discovered pool set
//! - [`quote`]: per-hop amount propagation through the price oracle
//! - [`selector`]: best-route choice against the direct baseline
//! - [`execution`]: submission and callback correlation
//! - [`service`]: one end-to-end computation with published state
//!
//! # Example
//!
//! ```ignore
//! let service = RouteService::new(RouterConfig::default(), collaborators)?;
//! let request = RouteRequest::forward(usdt, weth, 1_000_000);
//! if let Some(route) = service.build_and_select_route(&request).await? {
//!     let correlator = service.execution_correlator(ledger, sender);
//!     let mut events = correlator.execute(&route).await.into_stream();
//!     while let Some(event) = events.next().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod builder;
pub mod calculator;
pub mod correlation;
pub mod execution;
pub mod payload;
pub mod providers;
pub mod quote;
pub mod registry;
pub mod selector;
pub mod service;
pub mod state;

#[cfg(test)]
mod test_support;

pub use builder::{build_pool_graph, PoolGraph, RouteBuilder};
pub use calculator::{apply_slippage, format_price, route_prices};
pub use correlation::{
    Correlation, ExecutionOutcome, SettledHop, SlotState, SlotUpdate, StepStatus,
};
pub use execution::{Execution, ExecutionCorrelator, ExecutionEvent, ExecutionPhase};
pub use payload::{NextStep, PayloadError, RoutePayload};
pub use providers::{
    DirectSwapQuoter, HopQuote, PairDiscovery, PriceImpactEstimator, PriceOracle,
    SlippageComposer,
};
pub use quote::QuoteEngine;
pub use registry::PairRegistry;
pub use selector::RouteSelector;
pub use service::{Collaborators, RouteService, RouterState};
pub use state::{Bill, Direction, RouteCandidate, RouteRequest, RouteStep, SwapRoute};
