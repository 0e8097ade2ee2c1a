//! Route Builder: cross-pair path assembly
//!
//! Pair discovery hands over only pools that touch one of the endpoints, so
//! routes are assembled as an intersection rather than by open graph search:
//! simple chains are grown from the left token and from the right token, and
//! joined where they meet on a common bridging token.

use std::collections::{HashMap, HashSet, VecDeque};

use hopswap_core::{Pool, TokenRoot};

use crate::state::RouteCandidate;

/// Default maximum hops per route
pub const DEFAULT_MAX_HOPS: usize = 3;

// ---------------------------------------------------------------------------
// Pool graph
// ---------------------------------------------------------------------------

/// An edge in the pool graph connecting two tokens via a specific pool.
#[derive(Debug, Clone)]
pub struct PoolEdge {
    pub pool: Pool,
    pub token_in: TokenRoot,
    pub token_out: TokenRoot,
    pub reserve_in: u128,
}

/// Adjacency-list pool graph.
#[derive(Debug, Clone, Default)]
pub struct PoolGraph {
    pub adjacency: HashMap<TokenRoot, Vec<PoolEdge>>,
    pub pool_count: usize,
}

impl PoolGraph {
    fn edges_from(&self, token: &TokenRoot) -> &[PoolEdge] {
        self.adjacency
            .get(token)
            .map(|edges| edges.as_slice())
            .unwrap_or(&[])
    }
}

/// Build a pool graph from candidate pools.
///
/// Every pool adds edges in both directions. Pools with an empty reserve are
/// skipped. When several pools trade the same pair, only the deepest (by
/// input-side reserve, ties broken by address) is kept so each token chain
/// maps to exactly one route.
pub fn build_pool_graph(pools: &[Pool]) -> PoolGraph {
    let mut adjacency: HashMap<TokenRoot, Vec<PoolEdge>> = HashMap::new();
    let mut pool_count = 0;

    for pool in pools {
        if !pool.has_liquidity() || pool.left_root == pool.right_root {
            tracing::debug!("Skipping pool {} without usable liquidity", pool.address);
            continue;
        }

        for token_in in [&pool.left_root, &pool.right_root] {
            let (Some(token_out), Some(reserve_in)) =
                (pool.other_side(token_in), pool.reserve_of(token_in))
            else {
                continue;
            };
            adjacency
                .entry(token_in.clone())
                .or_default()
                .push(PoolEdge {
                    pool: pool.clone(),
                    token_in: token_in.clone(),
                    token_out: token_out.clone(),
                    reserve_in,
                });
        }

        pool_count += 1;
    }

    // Prune: keep the deepest pool per (token_in, token_out) pair
    for edges in adjacency.values_mut() {
        edges.sort_by(|a, b| {
            a.token_out
                .cmp(&b.token_out)
                .then(b.reserve_in.cmp(&a.reserve_in))
                .then(a.pool.address.cmp(&b.pool.address))
        });
        edges.dedup_by(|later, kept| later.token_out == kept.token_out);
    }

    PoolGraph {
        adjacency,
        pool_count,
    }
}

// ---------------------------------------------------------------------------
// Half paths
// ---------------------------------------------------------------------------

/// Simple chain grown outward from one endpoint.
#[derive(Debug, Clone)]
struct HalfPath {
    /// `tokens[0]` is the endpoint, the last token is the frontier
    tokens: Vec<TokenRoot>,
    pools: Vec<Pool>,
}

impl HalfPath {
    fn frontier(&self) -> &TokenRoot {
        &self.tokens[self.tokens.len() - 1]
    }

    fn len(&self) -> usize {
        self.pools.len()
    }
}

/// All simple chains of 1..=`max_len` hops starting at `start` that never
/// touch `avoid` (the opposite endpoint).
fn half_paths(
    graph: &PoolGraph,
    start: &TokenRoot,
    avoid: &TokenRoot,
    max_len: usize,
) -> Vec<HalfPath> {
    let mut results = Vec::new();
    let mut queue: VecDeque<HalfPath> = VecDeque::new();
    queue.push_back(HalfPath {
        tokens: vec![start.clone()],
        pools: Vec::new(),
    });

    while let Some(path) = queue.pop_front() {
        if path.len() >= max_len {
            continue;
        }
        for edge in graph.edges_from(path.frontier()) {
            if &edge.token_out == avoid || path.tokens.contains(&edge.token_out) {
                continue;
            }
            let mut next = path.clone();
            next.tokens.push(edge.token_out.clone());
            next.pools.push(edge.pool.clone());
            results.push(next.clone());
            queue.push_back(next);
        }
    }

    results
}

// ---------------------------------------------------------------------------
// Route builder
// ---------------------------------------------------------------------------

/// Assembles cross-pair route skeletons from a candidate pool set.
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    max_hops: usize,
}

impl Default for RouteBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HOPS)
    }
}

impl RouteBuilder {
    pub fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Build every distinct simple chain of 2..=max_hops hops from `left` to
    /// `right`. The direct single-hop pair is never returned; it is the
    /// selection baseline. An empty result means no bridging token exists.
    pub fn build(
        &self,
        left: &TokenRoot,
        right: &TokenRoot,
        pools: &[Pool],
    ) -> Vec<RouteCandidate> {
        if left == right || self.max_hops < 2 {
            return Vec::new();
        }

        let graph = build_pool_graph(pools);
        let left_depth = self.max_hops - self.max_hops / 2;
        let right_depth = self.max_hops / 2;

        let left_halves = half_paths(&graph, left, right, left_depth);

        // Right halves indexed by (length, meeting token)
        let right_paths = half_paths(&graph, right, left, right_depth);
        let mut right_halves: HashMap<(usize, &TokenRoot), Vec<&HalfPath>> = HashMap::new();
        for path in &right_paths {
            right_halves
                .entry((path.len(), path.frontier()))
                .or_default()
                .push(path);
        }

        let mut candidates = Vec::new();
        for hops in 2..=self.max_hops {
            let left_len = hops - hops / 2;
            let right_len = hops / 2;

            for left_half in left_halves.iter().filter(|p| p.len() == left_len) {
                let Some(matches) = right_halves.get(&(right_len, left_half.frontier())) else {
                    continue;
                };
                for right_half in matches {
                    if let Some(candidate) = join_halves(left_half, right_half) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.hop_count()
                .cmp(&b.hop_count())
                .then_with(|| a.tokens.cmp(&b.tokens))
        });

        tracing::debug!(
            "Built {} cross-pair candidates {} -> {} from {} pools (max {} hops)",
            candidates.len(),
            left,
            right,
            graph.pool_count,
            self.max_hops
        );
        candidates
    }
}

/// Join a left half ending at the meeting token with a right half ending at
/// the same token. Returns `None` if the halves share any other token.
fn join_halves(left: &HalfPath, right: &HalfPath) -> Option<RouteCandidate> {
    let left_tokens: HashSet<&TokenRoot> = left.tokens[..left.tokens.len() - 1].iter().collect();
    let right_tokens = &right.tokens[..right.tokens.len() - 1];
    if right_tokens.iter().any(|t| left_tokens.contains(t)) {
        return None;
    }

    let mut tokens = left.tokens.clone();
    tokens.extend(right_tokens.iter().rev().cloned());

    let mut pools = left.pools.clone();
    pools.extend(right.pools.iter().rev().cloned());

    Some(RouteCandidate { tokens, pools })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pool;

    fn roots(candidate: &RouteCandidate) -> Vec<&str> {
        candidate.tokens.iter().map(|t| t.as_str()).collect()
    }

    fn addresses(candidate: &RouteCandidate) -> Vec<&str> {
        candidate.pools.iter().map(|p| p.address.as_str()).collect()
    }

    // -- Graph Construction --

    #[test]
    fn test_build_graph_both_directions() {
        let graph = build_pool_graph(&[pool("xy", "x", "y", 1_000, 2_000)]);
        assert_eq!(graph.pool_count, 1);
        assert_eq!(graph.adjacency[&TokenRoot::new("x")][0].token_out.as_str(), "y");
        assert_eq!(graph.adjacency[&TokenRoot::new("y")][0].reserve_in, 2_000);
    }

    #[test]
    fn test_empty_pools_skipped() {
        let graph = build_pool_graph(&[
            pool("xy", "x", "y", 0, 2_000),
            pool("yz", "y", "z", 1_000, 1_000),
        ]);
        assert_eq!(graph.pool_count, 1);
        assert!(!graph.adjacency.contains_key(&TokenRoot::new("x")));
    }

    #[test]
    fn test_deepest_pool_per_pair_kept() {
        let graph = build_pool_graph(&[
            pool("shallow", "x", "y", 1_000, 1_000),
            pool("deep", "x", "y", 9_000, 9_000),
        ]);
        let edges = &graph.adjacency[&TokenRoot::new("x")];
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].pool.address.as_str(), "deep");
    }

    // -- Candidate Assembly --

    #[test]
    fn test_two_hop_single_bridge() {
        let pools = vec![pool("xy", "x", "y", 1_000, 1_000), pool("yz", "y", "z", 1_000, 1_000)];
        let routes = RouteBuilder::new(2).build(&TokenRoot::new("x"), &TokenRoot::new("z"), &pools);
        assert_eq!(routes.len(), 1);
        assert_eq!(roots(&routes[0]), vec!["x", "y", "z"]);
        assert_eq!(addresses(&routes[0]), vec!["xy", "yz"]);
    }

    #[test]
    fn test_direct_pair_excluded() {
        let pools = vec![
            pool("xy", "x", "y", 1_000, 1_000),
            pool("yz", "y", "z", 1_000, 1_000),
            pool("xz", "x", "z", 1_000, 1_000),
        ];
        let routes = RouteBuilder::new(2).build(&TokenRoot::new("x"), &TokenRoot::new("z"), &pools);
        assert_eq!(routes.len(), 1);
        assert!(routes.iter().all(|r| r.hop_count() >= 2));
    }

    #[test]
    fn test_no_bridge_is_empty() {
        let pools = vec![pool("xa", "x", "a", 1_000, 1_000), pool("bz", "b", "z", 1_000, 1_000)];
        let routes = RouteBuilder::new(2).build(&TokenRoot::new("x"), &TokenRoot::new("z"), &pools);
        assert!(routes.is_empty());
    }

    #[test]
    fn test_three_hop_needs_limit() {
        let pools = vec![
            pool("xa", "x", "a", 1_000, 1_000),
            pool("ab", "a", "b", 1_000, 1_000),
            pool("bz", "b", "z", 1_000, 1_000),
        ];
        let x = TokenRoot::new("x");
        let z = TokenRoot::new("z");

        assert!(RouteBuilder::new(2).build(&x, &z, &pools).is_empty());

        let routes = RouteBuilder::new(3).build(&x, &z, &pools);
        assert_eq!(routes.len(), 1);
        assert_eq!(roots(&routes[0]), vec!["x", "a", "b", "z"]);
        assert_eq!(addresses(&routes[0]), vec!["xa", "ab", "bz"]);
    }

    #[test]
    fn test_multiple_bridges_sorted() {
        let pools = vec![
            pool("xb", "x", "b", 1_000, 1_000),
            pool("bz", "b", "z", 1_000, 1_000),
            pool("xa", "x", "a", 1_000, 1_000),
            pool("az", "a", "z", 1_000, 1_000),
            pool("ab", "a", "b", 1_000, 1_000),
        ];
        let routes = RouteBuilder::new(3).build(&TokenRoot::new("x"), &TokenRoot::new("z"), &pools);
        let chains: Vec<Vec<&str>> = routes.iter().map(roots).collect();
        assert_eq!(
            chains,
            vec![
                vec!["x", "a", "z"],
                vec!["x", "b", "z"],
                vec!["x", "a", "b", "z"],
                vec!["x", "b", "a", "z"],
            ]
        );
    }

    #[test]
    fn test_chains_are_simple_and_connected() {
        // Dense graph over five tokens
        let tokens = ["x", "a", "b", "c", "z"];
        let mut pools = Vec::new();
        for (i, l) in tokens.iter().enumerate() {
            for r in &tokens[i + 1..] {
                pools.push(pool(&format!("{}{}", l, r), l, r, 1_000, 1_000));
            }
        }
        let x = TokenRoot::new("x");
        let z = TokenRoot::new("z");
        let routes = RouteBuilder::new(3).build(&x, &z, &pools);
        assert!(!routes.is_empty());

        for route in &routes {
            assert!(route.hop_count() >= 2 && route.hop_count() <= 3);
            assert_eq!(route.tokens.first(), Some(&x));
            assert_eq!(route.tokens.last(), Some(&z));
            let unique: HashSet<&TokenRoot> = route.tokens.iter().collect();
            assert_eq!(unique.len(), route.tokens.len(), "token repeats in {}", route);
            for (i, pool) in route.pools.iter().enumerate() {
                assert!(pool.touches(&route.tokens[i]));
                assert!(pool.touches(&route.tokens[i + 1]));
            }
        }

        let distinct: HashSet<Vec<TokenRoot>> = routes.iter().map(|r| r.tokens.clone()).collect();
        assert_eq!(distinct.len(), routes.len());
        // 3 two-hop bridges + 3 * 2 ordered three-hop pairs
        assert_eq!(routes.len(), 9);
    }

    #[test]
    fn test_same_endpoints_empty() {
        let pools = vec![pool("xy", "x", "y", 1_000, 1_000)];
        let x = TokenRoot::new("x");
        assert!(RouteBuilder::default().build(&x, &x, &pools).is_empty());
    }
}
