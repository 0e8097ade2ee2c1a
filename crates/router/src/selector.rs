//! Route Selector
//!
//! Picks at most one quoted route against the direct-swap baseline. Every
//! pass starts from "no route selected"; the only memory carried between
//! passes is the previous request and the pools of what was selected for
//! it, used only to break ties between equally good routes.

use std::sync::Arc;

use hopswap_core::{Address, Amount, Slippage};

use crate::calculator::route_prices;
use crate::providers::SlippageComposer;
use crate::state::{Bill, Direction, RouteRequest, SwapRoute};

#[derive(Debug, Clone)]
struct PreviousPass {
    amount: Amount,
    direction: Direction,
    selected_pairs: Option<Vec<Address>>,
}

pub struct RouteSelector {
    composer: Arc<dyn SlippageComposer>,
    base_slippage: Slippage,
    price_precision: u32,
    previous: Option<PreviousPass>,
}

impl RouteSelector {
    pub fn new(
        composer: Arc<dyn SlippageComposer>,
        base_slippage: Slippage,
        price_precision: u32,
    ) -> Self {
        Self {
            composer,
            base_slippage,
            price_precision,
            previous: None,
        }
    }

    /// Select the best of `routes` for `request`, or `None` when no route
    /// beats the direct baseline.
    pub fn select(
        &mut self,
        request: &RouteRequest,
        routes: Vec<SwapRoute>,
        direct: Option<&Bill>,
    ) -> Option<SwapRoute> {
        let usable = routes
            .into_iter()
            .filter(|r| !r.is_empty() && r.bill.expected_amount > 0 && r.bill.amount > 0);

        let chosen = match request.direction {
            Direction::Forward => {
                let preferred = self.preferred_pairs(request);
                select_forward(usable, direct, preferred)
            }
            Direction::Reverse => select_reverse(usable, direct, request.is_enough_liquidity),
        };

        let selected = chosen.map(|route| self.finalize(route, request));

        self.previous = Some(PreviousPass {
            amount: request.amount,
            direction: request.direction,
            selected_pairs: selected.as_ref().map(|r| r.pairs.clone()),
        });

        match &selected {
            Some(route) => tracing::info!(
                "Selected {}-hop route {} -> {} for {} ({:?}): expected {}",
                route.hop_count(),
                route.left_root,
                route.right_root,
                request.amount,
                request.direction,
                route.bill.expected_amount
            ),
            None => tracing::debug!(
                "No cross-pair route beats the direct swap for {} ({:?})",
                request.amount,
                request.direction
            ),
        }

        selected
    }

    /// Pools of the previous forward selection, kept as the tie-break
    /// preference. Dropped when the amount went down or the direction changed.
    fn preferred_pairs(&self, request: &RouteRequest) -> Option<&[Address]> {
        let prev = self.previous.as_ref()?;
        if request.amount < prev.amount {
            tracing::debug!(
                "Amount decreased {} -> {}, dropping previous selection",
                prev.amount,
                request.amount
            );
            return None;
        }
        if prev.direction != Direction::Forward {
            return None;
        }
        prev.selected_pairs.as_deref()
    }

    fn finalize(&self, mut route: SwapRoute, request: &RouteRequest) -> SwapRoute {
        route.slippage = self
            .composer
            .compose(self.base_slippage, route.hop_count());

        let (forward, reverse) = route_prices(
            route.bill.amount,
            request.left.decimals,
            route.bill.expected_amount,
            request.right.decimals,
            self.price_precision,
        );
        route.price_left_to_right = forward;
        route.price_right_to_left = reverse;
        route
    }
}

/// Highest expected output, strictly above the direct baseline. Ties go to
/// the `preferred` pools when present among them, otherwise to the earliest.
fn select_forward(
    routes: impl Iterator<Item = SwapRoute>,
    direct: Option<&Bill>,
    preferred: Option<&[Address]>,
) -> Option<SwapRoute> {
    let baseline = direct.map(|b| b.expected_amount).unwrap_or(0);
    let is_preferred = |route: &SwapRoute| preferred == Some(route.pairs.as_slice());

    routes
        .filter(|r| r.bill.expected_amount > baseline)
        .fold(None, |best: Option<SwapRoute>, route| match best {
            Some(b) if b.bill.expected_amount > route.bill.expected_amount => Some(b),
            Some(b)
                if b.bill.expected_amount == route.bill.expected_amount
                    && (is_preferred(&b) || !is_preferred(&route)) =>
            {
                Some(b)
            }
            _ => Some(route),
        })
}

/// Lowest required input. Before liquidity is confirmed the first usable
/// route is taken as a provisional answer.
fn select_reverse(
    mut routes: impl Iterator<Item = SwapRoute>,
    direct: Option<&Bill>,
    is_enough_liquidity: bool,
) -> Option<SwapRoute> {
    if !is_enough_liquidity {
        return routes.next();
    }

    let baseline = direct.map(|b| b.amount).filter(|amount| *amount > 0);

    routes
        .filter(|r| baseline.map_or(true, |direct| r.bill.amount < direct))
        .fold(None, |best: Option<SwapRoute>, route| match best {
            Some(b) if b.bill.amount <= route.bill.amount => Some(b),
            _ => Some(route),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RouteStep;
    use crate::test_support::{token, LinearComposer};
    use hopswap_core::{Address, TokenRoot};

    fn quoted(via: &str, direction: Direction, amount: Amount, expected: Amount) -> SwapRoute {
        let hop = |spend: &str, receive: &str, amount, expected| RouteStep {
            spend_root: TokenRoot::new(spend),
            receive_root: TokenRoot::new(receive),
            pool: Address::new(format!("{}{}", spend, receive)),
            amount,
            expected_amount: expected,
            min_expected_amount: expected,
            fee: "1".to_string(),
        };
        let steps = vec![hop("x", via, amount, amount), hop(via, "z", amount, expected)];
        SwapRoute {
            direction,
            left_root: TokenRoot::new("x"),
            right_root: TokenRoot::new("z"),
            pairs: steps.iter().map(|s| s.pool.clone()).collect(),
            intermediate: vec![TokenRoot::new(via)],
            bill: Bill {
                amount,
                expected_amount: expected,
                min_expected_amount: expected,
                fee: Some("1".to_string()),
                price_impact: None,
            },
            steps,
            slippage: Slippage::from_bps(50),
            price_left_to_right: None,
            price_right_to_left: None,
        }
    }

    fn selector() -> RouteSelector {
        RouteSelector::new(Arc::new(LinearComposer), Slippage::from_bps(50), 8)
    }

    fn forward(amount: Amount) -> RouteRequest {
        RouteRequest::forward(token("x"), token("z"), amount)
    }

    fn direct(amount: Amount, expected: Amount) -> Bill {
        Bill {
            amount,
            expected_amount: expected,
            min_expected_amount: expected,
            ..Bill::default()
        }
    }

    #[test]
    fn test_forward_beats_direct_baseline() {
        let mut selector = selector();
        let routes = vec![quoted("y", Direction::Forward, 1_000, 940)];

        let selected = selector
            .select(&forward(1_000), routes, Some(&direct(1_000, 900)))
            .unwrap();
        assert_eq!(selected.bill.expected_amount, 940);
        // composed over two hops
        assert_eq!(selected.slippage, Slippage::from_bps(100));
        assert_eq!(selected.price_left_to_right.as_deref(), Some("0.94"));
        assert_eq!(selected.price_right_to_left.as_deref(), Some("1.06382978"));
    }

    #[test]
    fn test_forward_never_ties_direct() {
        let mut selector = selector();
        let routes = vec![
            quoted("y", Direction::Forward, 1_000, 950),
            quoted("w", Direction::Forward, 1_000, 930),
        ];
        assert!(selector
            .select(&forward(1_000), routes, Some(&direct(1_000, 950)))
            .is_none());
    }

    #[test]
    fn test_forward_picks_max_expected() {
        let mut selector = selector();
        let routes = vec![
            quoted("y", Direction::Forward, 1_000, 910),
            quoted("w", Direction::Forward, 1_000, 960),
            quoted("v", Direction::Forward, 1_000, 940),
        ];
        let selected = selector.select(&forward(1_000), routes, None).unwrap();
        assert_eq!(selected.intermediate, vec![TokenRoot::new("w")]);
    }

    #[test]
    fn test_zero_step_route_never_selected() {
        let mut selector = selector();
        let mut empty = quoted("y", Direction::Forward, 1_000, 990);
        empty.steps.clear();
        assert!(selector.select(&forward(1_000), vec![empty], None).is_none());
    }

    #[test]
    fn test_smaller_amount_is_judged_on_its_own_quotes() {
        let mut selector = selector();
        let first = selector
            .select(
                &forward(2_000),
                vec![quoted("y", Direction::Forward, 2_000, 1_880)],
                None,
            )
            .unwrap();
        assert_eq!(first.bill.expected_amount, 1_880);

        // 940 < 1880, only the direct baseline of this pass counts
        let second = selector
            .select(
                &forward(1_000),
                vec![quoted("y", Direction::Forward, 1_000, 940)],
                Some(&direct(1_000, 900)),
            )
            .unwrap();
        assert_eq!(second.bill.expected_amount, 940);
    }

    #[test]
    fn test_unchanged_amount_reselects_every_pass() {
        let mut selector = selector();
        let passes = [940, 930, 930, 930];
        for expected in passes {
            let selected = selector.select(
                &forward(1_000),
                vec![quoted("w", Direction::Forward, 1_000, expected)],
                Some(&direct(1_000, 900)),
            );
            assert_eq!(
                selected.map(|r| r.bill.expected_amount),
                Some(expected),
                "route beating the direct swap must be selected"
            );
        }
    }

    #[test]
    fn test_tie_keeps_previous_route() {
        let mut selector = selector();
        let first = selector
            .select(
                &forward(1_000),
                vec![quoted("y", Direction::Forward, 1_000, 940)],
                None,
            )
            .unwrap();
        assert_eq!(first.intermediate, vec![TokenRoot::new("y")]);

        let tied = vec![
            quoted("w", Direction::Forward, 1_000, 940),
            quoted("y", Direction::Forward, 1_000, 940),
        ];
        let second = selector.select(&forward(1_000), tied, None).unwrap();
        assert_eq!(second.intermediate, vec![TokenRoot::new("y")]);

        // a strictly better route still wins over the previous one
        let better = vec![
            quoted("y", Direction::Forward, 1_000, 940),
            quoted("w", Direction::Forward, 1_000, 941),
        ];
        let third = selector.select(&forward(1_000), better, None).unwrap();
        assert_eq!(third.intermediate, vec![TokenRoot::new("w")]);
    }

    #[test]
    fn test_tie_preference_dropped_when_amount_decreases() {
        let mut selector = selector();
        selector
            .select(
                &forward(2_000),
                vec![quoted("y", Direction::Forward, 2_000, 1_880)],
                None,
            )
            .unwrap();

        let tied = vec![
            quoted("w", Direction::Forward, 1_000, 940),
            quoted("y", Direction::Forward, 1_000, 940),
        ];
        let selected = selector.select(&forward(1_000), tied, None).unwrap();
        assert_eq!(selected.intermediate, vec![TokenRoot::new("w")]);
    }

    #[test]
    fn test_tie_preference_dropped_on_direction_change() {
        let mut selector = selector();
        selector
            .select(
                &forward(1_000),
                vec![quoted("y", Direction::Forward, 1_000, 940)],
                None,
            )
            .unwrap();
        let reverse = RouteRequest::reverse(token("x"), token("z"), 500, true);
        selector
            .select(&reverse, vec![quoted("y", Direction::Reverse, 540, 500)], None)
            .unwrap();

        let tied = vec![
            quoted("w", Direction::Forward, 1_000, 700),
            quoted("y", Direction::Forward, 1_000, 700),
        ];
        let selected = selector.select(&forward(1_000), tied, None).unwrap();
        assert_eq!(selected.intermediate, vec![TokenRoot::new("w")]);
    }

    #[test]
    fn test_reverse_minimizes_input() {
        let mut selector = selector();
        let request = RouteRequest::reverse(token("x"), token("z"), 500, true);
        let routes = vec![
            quoted("y", Direction::Reverse, 560, 500),
            quoted("w", Direction::Reverse, 520, 500),
            quoted("v", Direction::Reverse, 540, 500),
        ];
        let selected = selector
            .select(&request, routes, Some(&direct(530, 500)))
            .unwrap();
        assert_eq!(selected.bill.amount, 520);
    }

    #[test]
    fn test_reverse_must_undercut_direct() {
        let mut selector = selector();
        let request = RouteRequest::reverse(token("x"), token("z"), 500, true);
        let routes = vec![quoted("y", Direction::Reverse, 520, 500)];
        assert!(selector
            .select(&request, routes, Some(&direct(520, 500)))
            .is_none());
    }

    #[test]
    fn test_reverse_provisional_without_liquidity() {
        let mut selector = selector();
        let request = RouteRequest::reverse(token("x"), token("z"), 500, false);
        let routes = vec![
            quoted("y", Direction::Reverse, 560, 0),
            quoted("w", Direction::Reverse, 600, 500),
            quoted("v", Direction::Reverse, 520, 500),
        ];
        let selected = selector
            .select(&request, routes, Some(&direct(510, 500)))
            .unwrap();
        // first route with nonzero output, regardless of cost or baseline
        assert_eq!(selected.intermediate, vec![TokenRoot::new("w")]);
    }
}
