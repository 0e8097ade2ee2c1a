//! Route service
//!
//! Runs one route computation end to end: discovery, pool refresh, route
//! building, quoting and selection. The result replaces the published
//! router state wholesale; consumers follow it through a watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hopswap_core::{Address, Amount, RouteError, RouterConfig};
use ledger_client::Ledger;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::builder::RouteBuilder;
use crate::execution::ExecutionCorrelator;
use crate::providers::{
    DirectSwapQuoter, PairDiscovery, PriceImpactEstimator, PriceOracle, SlippageComposer,
};
use crate::quote::QuoteEngine;
use crate::registry::PairRegistry;
use crate::selector::RouteSelector;
use crate::state::{Bill, Direction, RouteRequest, SwapRoute};

/// External handles the router depends on
#[derive(Clone)]
pub struct Collaborators {
    pub discovery: Arc<dyn PairDiscovery>,
    pub oracle: Arc<dyn PriceOracle>,
    pub composer: Arc<dyn SlippageComposer>,
    pub impact: Arc<dyn PriceImpactEstimator>,
    pub direct: Arc<dyn DirectSwapQuoter>,
}

/// Outcome of the latest computation. A computation that fails leaves the
/// cleared state it started from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    /// Selected cross-pair route, if any beat the direct swap
    pub route: Option<SwapRoute>,
    /// Direct-swap baseline the route was compared against
    pub direct: Option<Bill>,
    pub amount: Amount,
    pub direction: Option<Direction>,
}

pub struct RouteService {
    config: RouterConfig,
    discovery: Arc<dyn PairDiscovery>,
    direct: Arc<dyn DirectSwapQuoter>,
    registry: PairRegistry,
    builder: RouteBuilder,
    quotes: QuoteEngine,
    selector: Mutex<RouteSelector>,
    busy: AtomicBool,
    state: watch::Sender<RouterState>,
}

/// Clears the busy flag when a computation ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RouteService {
    pub fn new(config: RouterConfig, collaborators: Collaborators) -> hopswap_core::Result<Self> {
        config.validate()?;

        let selector = RouteSelector::new(
            collaborators.composer,
            config.base_slippage,
            config.price_precision,
        );
        let (state, _) = watch::channel(RouterState::default());

        Ok(Self {
            builder: RouteBuilder::new(config.max_hops),
            registry: PairRegistry::new(collaborators.oracle.clone()),
            quotes: QuoteEngine::new(collaborators.oracle, collaborators.impact),
            discovery: collaborators.discovery,
            direct: collaborators.direct,
            selector: Mutex::new(selector),
            busy: AtomicBool::new(false),
            state,
            config,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Follow router state updates
    pub fn subscribe(&self) -> watch::Receiver<RouterState> {
        self.state.subscribe()
    }

    /// Latest published state
    pub fn state(&self) -> RouterState {
        self.state.borrow().clone()
    }

    /// Correlator submitting routes for `sender` with the configured gas
    /// sizing and timeout
    pub fn execution_correlator(
        &self,
        ledger: Arc<dyn Ledger>,
        sender: Address,
    ) -> ExecutionCorrelator {
        ExecutionCorrelator::new(ledger, sender, self.config.gas.clone())
            .with_timeout(self.config.correlation_timeout())
    }

    /// Compute the best cross-pair route for `request`.
    ///
    /// Returns `Ok(None)` when no cross-pair route beats the direct swap;
    /// the caller falls back to the direct baseline in that case. A request
    /// arriving while another computation is running is refused with
    /// [`RouteError::Busy`].
    pub async fn build_and_select_route(
        &self,
        request: &RouteRequest,
    ) -> Result<Option<SwapRoute>, RouteError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::debug!("Route computation in progress, dropping request");
            return Err(RouteError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        self.state.send_replace(RouterState {
            route: None,
            direct: None,
            amount: request.amount,
            direction: Some(request.direction),
        });

        if request.amount == 0 {
            return Err(RouteError::InvalidAmount {
                message: "amount must be greater than zero".to_string(),
            });
        }
        let (left, right) = (&request.left.root, &request.right.root);
        if left == right {
            return Err(RouteError::InvalidRoute {
                reason: format!("cannot route {} to itself", left),
            });
        }

        let discovered = self
            .discovery
            .find_candidate_pools(
                left,
                right,
                self.config.max_hops,
                self.config.min_liquidity_usd,
            )
            .await
            .map_err(|e| RouteError::Discovery {
                message: format!("{:#}", e),
            })?;

        let pools = self.registry.refresh(discovered).await;
        let candidates = self.builder.build(left, right, &pools);
        if candidates.is_empty() {
            let err = RouteError::NoRouteFound {
                left: left.clone(),
                right: right.clone(),
            };
            tracing::info!("{}, falling back to direct swap", err);
        }

        let (routes, direct) = futures::join!(
            self.quotes.quote_all(
                &candidates,
                request.direction,
                request.amount,
                self.config.base_slippage,
            ),
            self.direct_baseline(request),
        );

        let selected = {
            let mut selector = self.selector.lock().await;
            selector.select(request, routes, direct.as_ref())
        };

        self.state.send_replace(RouterState {
            route: selected.clone(),
            direct,
            amount: request.amount,
            direction: Some(request.direction),
        });

        Ok(selected)
    }

    async fn direct_baseline(&self, request: &RouteRequest) -> Option<Bill> {
        match self
            .direct
            .quote_direct(
                &request.left.root,
                &request.right.root,
                request.amount,
                request.direction,
            )
            .await
        {
            Ok(bill) => bill,
            Err(e) => {
                tracing::warn!("Direct swap quote unavailable: {:#}", e);
                None
            }
        }
    }
}
