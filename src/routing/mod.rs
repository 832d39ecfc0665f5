//! Greedy routing with optional backtracking and path folding.

pub mod selector;

use log::trace;
use rand::{Rng, RngCore};

use crate::graph::folding::{self, PathFoldingResult};
use crate::graph::Graph;
use crate::policy::{FoldingPolicy, RoutingPolicy};
use crate::routing::selector::PeerSelector;

/// Outcome of routing one request.
#[derive(Debug, Clone)]
pub struct RouteResult {
    /// True if and only if the request arrived at its exact target.
    pub success: bool,
    /// Nodes visited, origin first. Empty for failed requests.
    pub routing_path: Vec<usize>,
    /// Hops consumed in total, including backtracked branches.
    pub travel_length: u32,
    /// Topology changes applied on arrival.
    pub folding: PathFoldingResult,
}

impl RouteResult {
    fn failed(travel_length: u32) -> Self {
        RouteResult {
            success: false,
            routing_path: Vec::new(),
            travel_length,
            folding: PathFoldingResult::default(),
        }
    }

    pub fn path_length(&self) -> usize {
        self.routing_path.len()
    }
}

/// Per-run routing parameters.
#[derive(Debug, Clone, Copy)]
pub struct RouteParams {
    pub routing_policy: RoutingPolicy,
    pub folding_policy: FoldingPolicy,
    /// Maximum hops a request may consume.
    pub max_htl: u32,
    /// Lookahead depth for candidate ranking.
    pub lookahead: u32,
    /// Loop detection window; zero uses per-node request markers.
    pub lookback: u32,
    /// Use the open-capacity fold rule instead of the old one.
    pub new_fold_rule: bool,
    /// Decimal digits retained under the precision loss policy.
    pub significant_digits: u32,
    /// Chance per hop of ignoring the selector and routing randomly.
    pub random_chance: f64,
}

/// Route a request from `origin` to `target`'s location. The request
/// id must be unique per request; loop detection and backtracking use
/// it to mark visited nodes.
pub fn route(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    origin: usize,
    target: usize,
    request_id: u64,
    params: &RouteParams,
) -> RouteResult {
    assert!(params.max_htl >= 1, "hop budget must be positive");

    let selector = match params.routing_policy {
        RoutingPolicy::Greedy => PeerSelector::Greedy,
        RoutingPolicy::LoopDetection | RoutingPolicy::Backtracking => {
            PeerSelector::LoopDetection {
                lookback: params.lookback,
                request_id,
            }
        }
        RoutingPolicy::PrecisionLoss => PeerSelector::PrecisionLoss {
            lookback: params.lookback,
            request_id,
            significant_digits: params.significant_digits,
        },
    };
    let backtracking = matches!(
        params.routing_policy,
        RoutingPolicy::Backtracking | RoutingPolicy::PrecisionLoss
    );
    // The lookahead cache has no invalidation story once folding
    // rewires the topology mid-run.
    let cache_enabled = params.folding_policy == FoldingPolicy::None;

    let target_location = graph.node(target).location;
    let mut path = Vec::new();
    let result = descend(
        graph,
        rng,
        &selector,
        origin,
        target_location,
        params.max_htl,
        params,
        backtracking,
        cache_enabled,
        request_id,
        &mut path,
    );
    trace!(
        "request {}: success={} path={} travel={}",
        request_id,
        result.success,
        result.path_length(),
        result.travel_length
    );
    result
}

#[allow(clippy::too_many_arguments)]
fn descend(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    selector: &PeerSelector,
    current: usize,
    target: f64,
    mut htl: u32,
    params: &RouteParams,
    backtracking: bool,
    cache_enabled: bool,
    request_id: u64,
    path: &mut Vec<usize>,
) -> RouteResult {
    assert!(htl >= 1, "descended with an exhausted hop budget");

    if backtracking {
        graph.node_mut(current).last_routed = request_id;
    }
    path.push(current);

    // The target was picked from among node locations, so an exact
    // comparison is the arrival check.
    if graph.node(current).location == target {
        let folding = folding::fold_on_success(
            graph,
            rng,
            path,
            params.folding_policy,
            params.new_fold_rule,
        );
        return RouteResult {
            success: true,
            routing_path: path.clone(),
            travel_length: params.max_htl - htl + 1,
            folding,
        };
    }

    loop {
        htl -= 1;
        if htl == 0 {
            return RouteResult::failed(params.max_htl);
        }

        let mut next = selector.select_peer(
            graph,
            current,
            target,
            params.lookahead,
            path,
            cache_enabled,
            rng,
        );

        // Chance to ignore the ranking entirely and route blind.
        if params.random_chance > 0.0 && rng.gen::<f64>() < params.random_chance {
            let degree = graph.node(current).degree();
            if degree > 0 {
                next = graph.node(current).neighbors[rng.gen_range(0..degree)];
            }
        }

        // Nowhere closer or admissible, and this node is not the
        // target: the request is stuck here.
        if next == current {
            if let Some(position) = path.iter().position(|&n| n == current) {
                path.remove(position);
            }
            return RouteResult::failed(params.max_htl - htl);
        }

        let result = descend(
            graph,
            rng,
            selector,
            next,
            target,
            htl,
            params,
            backtracking,
            cache_enabled,
            request_id,
            path,
        );

        if result.success || !backtracking {
            return result;
        }

        // Retry from here with the hops the failed branch consumed
        // subtracted from the budget.
        htl = params.max_htl - result.travel_length + 1;
    }
}
