//! Path folding: topology rewiring after a successful request.
//!
//! FREENET folding offers nodes along the successful path a connection
//! toward the endpoint; the Sandberg policies rewire shortcut edges to
//! the endpoint while leaving lattice links alone.

use log::trace;
use rand::{Rng, RngCore};

use crate::graph::Graph;
use crate::policy::FoldingPolicy;

/// Fraction of fold offers an at-degree node accepts under the old
/// fold rule; under the Sandberg policies, the fraction it rejects.
const FOLD_ACCEPTANCE_RATE: f64 = 0.07;

/// Chance per step of restarting the new fold rule from the current
/// position rather than the path endpoint.
const FOLD_RESET_CHANCE: f64 = 0.05;

/// Outcome of folding along one successful path.
#[derive(Debug, Clone, Default)]
pub struct PathFoldingResult {
    /// Nodes left with zero connections by the folds.
    pub disconnected: Vec<usize>,
    /// Number of folds performed.
    pub folding_operations: u32,
}

impl PathFoldingResult {
    fn folded(&mut self) {
        self.folding_operations += 1;
    }

    fn add_disconnected(&mut self, node: usize) {
        self.disconnected.push(node);
    }
}

/// Apply the folding policy to a successful routing path. The first
/// element of `path` is the request origin; the last is the endpoint.
pub fn fold_on_success(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    path: &[usize],
    policy: FoldingPolicy,
    new_fold_rule: bool,
) -> PathFoldingResult {
    // Nothing to fold when the origin was already the endpoint.
    if path.len() < 2 {
        return PathFoldingResult::default();
    }
    match policy {
        FoldingPolicy::None => PathFoldingResult::default(),
        FoldingPolicy::Freenet => success_freenet(graph, rng, path, new_fold_rule),
        FoldingPolicy::Sandberg
        | FoldingPolicy::SandbergDirected
        | FoldingPolicy::SandbergNoLattice => success_sandberg(graph, rng, path, policy),
    }
}

/// Promote successful peers in each path node's recency queue, then
/// fold toward the endpoint with the selected rule.
fn success_freenet(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    path: &[usize],
    new_fold_rule: bool,
) -> PathFoldingResult {
    let mut from = path[path.len() - 1];
    for &to in path[..path.len() - 1].iter().rev() {
        if to == from {
            continue;
        }
        assert!(graph.node(to).is_connected(from));
        graph.node_mut(to).successful_request(Some(from));
        from = to;
    }

    if new_fold_rule {
        fold_path_new(graph, rng, path)
    } else {
        fold_path(graph, rng, path)
    }
}

/// Old fold rule: starting at the endpoint, offer each earlier node a
/// connection; when one accepts, the node before it starts the next
/// offer.
fn fold_path(graph: &mut Graph, rng: &mut dyn RngCore, path: &[usize]) -> PathFoldingResult {
    let mut result = PathFoldingResult::default();
    let mut from = path[path.len() - 1];
    let mut i = path.len() as isize - 2;

    while i >= 0 {
        let to = path[i as usize];
        i -= 1;
        if from == to {
            continue;
        }
        if graph.node(from).is_connected(to) {
            continue;
        }
        // The offering node drops its least recently used peer to make
        // room; remember it before the fold rewires anything.
        let candidate = graph.node_mut(from).disconnect_candidate();
        if offer_path_fold(graph, rng, to, from, FOLD_ACCEPTANCE_RATE) {
            result.folded();
            if let Some(candidate) = candidate {
                if graph.node(candidate).degree() == 0 {
                    result.add_disconnected(candidate);
                }
            }
            if i >= 0 {
                from = path[i as usize];
                i -= 1;
            }
        }
    }

    result
}

/// Offer `to` a connection from `from`. An at-degree `to` accepts with
/// the given probability; on acceptance `from` swaps out its least
/// recently used peer so its degree stays invariant.
fn offer_path_fold(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    to: usize,
    from: usize,
    acceptance_rate: f64,
) -> bool {
    if graph.node(to).at_degree() && rng.gen::<f64>() > acceptance_rate {
        return false;
    }

    let least = graph
        .node_mut(from)
        .disconnect_candidate()
        .expect("folding from a node with no connections");

    let initial =
        graph.node(to).degree() + graph.node(least).degree() + graph.node(from).degree();

    graph.disconnect(from, least);

    assert_ne!(to, from);
    // Peers gained by folding start out least recently used.
    graph.connect(to, from);
    demote_in_recency(graph, to, from);
    demote_in_recency(graph, from, to);

    debug_assert_eq!(
        initial,
        graph.node(to).degree() + graph.node(least).degree() + graph.node(from).degree()
    );

    true
}

/// New fold rule: offers only happen between nodes that both have room
/// for a peer, and each side at its degree swaps out its least
/// recently used connection.
fn fold_path_new(graph: &mut Graph, rng: &mut dyn RngCore, path: &[usize]) -> PathFoldingResult {
    let mut result = PathFoldingResult::default();
    let mut from = path[path.len() - 1];
    let mut i = path.len() as isize - 2;

    while i >= 0 {
        let to = path[i as usize];
        i -= 1;
        if !graph.node(from).has_open_peer() {
            from = to;
            continue;
        }
        if rng.gen::<f64>() > 1.0 - FOLD_RESET_CHANCE {
            from = to;
        }
        if from == to {
            continue;
        }
        if graph.node(from).is_connected(to) {
            continue;
        }
        if !graph.node(to).has_open_peer() {
            continue;
        }

        let folded_out = offer_path_fold_new(graph, to, from);
        if !folded_out.is_empty() {
            trace!("fold {} <- {}", to, from);
            result.folded();
            for candidate in folded_out {
                if graph.node(candidate).degree() == 0 {
                    result.add_disconnected(candidate);
                }
            }
            if i >= 0 {
                from = path[i as usize];
                i -= 1;
            }
        }
    }

    result
}

/// Mutual fold between `to` and `from`. Returns the disconnect
/// candidates considered on both sides; empty if the fold was refused.
fn offer_path_fold_new(graph: &mut Graph, to: usize, from: usize) -> Vec<usize> {
    if !graph.node(to).has_open_peer() || !graph.node(from).has_open_peer() {
        return Vec::new();
    }

    let their_candidate = graph.node_mut(from).disconnect_candidate();
    let our_candidate = graph.node_mut(to).disconnect_candidate();

    if graph.node(from).at_degree() {
        let dropped = their_candidate.expect("at-degree node with empty recency queue");
        graph.disconnect(from, dropped);
    }
    if graph.node(to).at_degree() {
        let dropped = our_candidate.expect("at-degree node with empty recency queue");
        graph.disconnect(to, dropped);
    }

    let folded_out: Vec<usize> = their_candidate
        .into_iter()
        .chain(our_candidate)
        .collect();

    graph.connect(to, from);
    demote_in_recency(graph, to, from);
    demote_in_recency(graph, from, to);

    folded_out
}

/// Move `peer` to the least recently used slot of `node`'s queue.
fn demote_in_recency(graph: &mut Graph, node: usize, peer: usize) {
    let recency = &mut graph.node_mut(node).recency;
    recency.remove(peer);
    recency.push_least(peer);
}

/// Sandberg folding: every node on the path is offered a shortcut
/// rewire to the endpoint.
fn success_sandberg(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    path: &[usize],
    policy: FoldingPolicy,
) -> PathFoldingResult {
    let mut result = PathFoldingResult::default();
    let endpoint = path[path.len() - 1];

    for &node in path[..path.len() - 1].iter().rev() {
        let disconnected =
            offer_shortcut_fold(graph, rng, node, endpoint, FOLD_ACCEPTANCE_RATE, policy);
        if let Some(disconnected) = disconnected {
            result.folded();
            if graph.node(disconnected).degree() == 0 {
                result.add_disconnected(disconnected);
            }
        }
    }

    // A node reported disconnected may appear earlier on the chain and
    // fold to the endpoint itself, gaining a connection back.
    result
        .disconnected
        .retain(|&node| graph.node(node).degree() == 0);

    result
}

/// Rewire one node's shortcut to the endpoint. Under the undirected
/// policies the endpoint gives up one of its shortcuts; under the
/// directed policy the folding node rewires its own. Returns the node
/// that lost a connection, or `None` if the fold did not occur.
fn offer_shortcut_fold(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    node: usize,
    endpoint: usize,
    rejection_rate: f64,
    policy: FoldingPolicy,
) -> Option<usize> {
    let lattice_links = match policy.lattice_links() {
        Some(count) => count,
        None => panic!("attempted shortcut folding with policy {:?}", policy),
    };

    if endpoint == node {
        return None;
    }
    if graph.node(node).is_connected(endpoint) {
        return None;
    }
    if graph.node(node).at_degree() && rng.gen::<f64>() < rejection_rate {
        return None;
    }

    // A node always keeps its lattice links.
    assert!(graph.node(node).degree() >= lattice_links);
    assert!(graph.node(endpoint).degree() >= lattice_links);

    // No shortcuts remain: there is no connection to drop.
    if graph.node(endpoint).degree() == lattice_links {
        return None;
    }

    let disconnected;
    let initial;

    if policy == FoldingPolicy::SandbergDirected {
        assert!(graph.node(node).degree() > lattice_links);
        let shortcut =
            rng.gen_range(0..graph.node(node).degree() - lattice_links) + lattice_links;
        disconnected = graph.node(node).neighbors[shortcut];

        initial = graph.node(node).degree()
            + graph.node(disconnected).degree()
            + graph.node(endpoint).degree();

        graph.disconnect_outgoing(node, disconnected);
        graph.connect_outgoing(node, endpoint);
    } else {
        // The endpoint drops one of its shortcuts.
        let shortcut =
            rng.gen_range(0..graph.node(endpoint).degree() - lattice_links) + lattice_links;
        disconnected = graph.node(endpoint).neighbors[shortcut];

        // The dropped node must keep its own lattice links.
        assert!(graph.node(disconnected).degree() > lattice_links);

        initial = graph.node(node).degree()
            + graph.node(disconnected).degree()
            + graph.node(endpoint).degree();

        graph.disconnect(endpoint, disconnected);
        graph.connect(endpoint, node);
    }

    debug_assert_eq!(
        initial,
        graph.node(node).degree()
            + graph.node(disconnected).degree()
            + graph.node(endpoint).degree()
    );

    Some(disconnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Node;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Path graph 0 - 1 - 2 - 3 with the given desired degree.
    fn chain(desired: u32) -> (Graph, Vec<usize>) {
        let nodes = (0..4)
            .map(|i| Node::new(i, i as f64 / 4.0, desired))
            .collect();
        let mut g = Graph::from_nodes(nodes);
        g.connect(0, 1);
        g.connect(1, 2);
        g.connect(2, 3);
        (g, vec![0, 1, 2, 3])
    }

    #[test]
    fn none_policy_changes_nothing() {
        let (mut g, path) = chain(3);
        let mut rng = StdRng::seed_from_u64(1);
        let before = g.clone();
        let result = fold_on_success(&mut g, &mut rng, &path, FoldingPolicy::None, true);
        assert_eq!(result.folding_operations, 0);
        assert!(result.disconnected.is_empty());
        assert!(g.equal(&before));
    }

    #[test]
    fn short_path_is_a_no_op() {
        let (mut g, _) = chain(3);
        let mut rng = StdRng::seed_from_u64(1);
        let result = fold_on_success(&mut g, &mut rng, &[2], FoldingPolicy::Freenet, true);
        assert_eq!(result.folding_operations, 0);
    }

    #[test]
    fn freenet_promotes_streaks_along_the_path() {
        let (mut g, path) = chain(10);
        let mut rng = StdRng::seed_from_u64(1);
        fold_on_success(&mut g, &mut rng, &path, FoldingPolicy::Freenet, true);
        // Every node except the endpoint served the request.
        for i in 0..3 {
            assert_eq!(g.node(i).streak(), 1, "node {}", i);
        }
        assert_eq!(g.node(3).streak(), 0);
    }

    #[test]
    fn new_rule_folds_endpoint_to_origin_below_degree() {
        // All nodes comfortably below degree: the only rng draws are
        // the per-step reset chances, so over many seeds folds happen
        // in the overwhelming majority of runs.
        let mut folded_runs = 0;
        for seed in 0..100 {
            let (mut g, path) = chain(10);
            let before: usize = g.degrees().iter().sum();
            let mut rng = StdRng::seed_from_u64(seed);
            let result =
                fold_on_success(&mut g, &mut rng, &path, FoldingPolicy::Freenet, true);
            assert_eq!(g.degrees().iter().sum::<usize>(), before + 2 * result.folding_operations as usize);
            if result.folding_operations > 0 {
                folded_runs += 1;
                assert!(result.disconnected.is_empty());
            }
        }
        assert!(folded_runs > 80, "folded in only {} runs", folded_runs);
    }

    #[test]
    fn old_rule_swaps_rather_than_grows_the_offering_node() {
        // Desired degree high enough that acceptance needs no draw on
        // the accepting side; the offering endpoint swaps its least
        // recently used connection for the new one.
        let (mut g, path) = chain(10);
        let mut rng = StdRng::seed_from_u64(5);
        let result = fold_on_success(&mut g, &mut rng, &path, FoldingPolicy::Freenet, false);
        assert!(result.folding_operations >= 1);
        // First fold: node 3 offers itself to node 1 (node 2 is
        // already connected), dropping its least recently used peer.
        assert!(g.node(1).is_connected(3));
        assert!(!g.node(3).is_connected(2));
    }

    #[test]
    fn new_rule_conserves_degree_when_both_sides_at_degree() {
        for seed in 0..100u64 {
            let (mut g, path) = chain(2);
            // All interior nodes are at degree 2; ends have degree 1.
            let before: usize = g.degrees().iter().sum();
            let mut rng = StdRng::seed_from_u64(seed);
            let result =
                fold_on_success(&mut g, &mut rng, &path, FoldingPolicy::Freenet, true);
            let after: usize = g.degrees().iter().sum();
            // Each fold adds one edge; each at-degree side drops one.
            assert!(after >= before.saturating_sub(2 * result.folding_operations as usize));
            for &node in &result.disconnected {
                assert_eq!(g.node(node).degree(), 0);
            }
        }
    }

    #[test]
    fn sandberg_directed_rewires_own_shortcut() {
        // Directed ring plus one directed shortcut per node; desired
        // degree 3 keeps every node below degree so no acceptance draw
        // is made and the outcome is deterministic.
        let nodes: Vec<Node> = (0..4).map(|i| Node::new(i, i as f64 / 4.0, 3)).collect();
        let mut g = Graph::from_nodes(nodes);
        g.add_lattice_links(true);
        g.connect_outgoing(0, 2);
        g.connect_outgoing(1, 3);
        g.connect_outgoing(2, 0);
        g.connect_outgoing(3, 1);

        let mut rng = StdRng::seed_from_u64(3);
        // Path 0 -> 3 -> 1: node 3 is already connected to the
        // endpoint, so only node 0 folds, rewiring its shortcut.
        let result = fold_on_success(
            &mut g,
            &mut rng,
            &[0, 3, 1],
            FoldingPolicy::SandbergDirected,
            false,
        );
        assert_eq!(result.folding_operations, 1);
        assert!(g.node(0).is_connected(1));
        assert!(!g.node(0).is_connected(2));
        // Lattice link untouched.
        assert!(g.node(0).is_connected(3));
        assert!(result.disconnected.is_empty());
    }

    #[test]
    fn sandberg_protects_lattice_prefix() {
        // Undirected lattice ring plus undirected shortcuts.
        let nodes: Vec<Node> = (0..6).map(|i| Node::new(i, i as f64 / 6.0, 3)).collect();
        let mut g = Graph::from_nodes(nodes);
        g.add_lattice_links(false);
        g.connect(0, 3);
        g.connect(1, 4);

        let before_edges = g.n_edges();
        let mut rng = StdRng::seed_from_u64(17);
        let result =
            fold_on_success(&mut g, &mut rng, &[5, 0, 1], FoldingPolicy::Sandberg, false);
        // Edge count is invariant under shortcut folding.
        assert_eq!(g.n_edges(), before_edges);
        // The ring itself is never broken.
        for i in 0..6 {
            assert!(g.node(i).is_connected((i + 1) % 6));
        }
        for &node in &result.disconnected {
            assert_eq!(g.node(node).degree(), 0);
        }
    }
}
