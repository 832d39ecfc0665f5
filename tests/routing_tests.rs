//! End-to-end routing runs over generated small-world topologies.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use routesim::graph::degree::FixedDegreeSource;
use routesim::graph::linklength::KleinbergLinkSource;
use routesim::graph::Graph;
use routesim::policy::{FoldingPolicy, RoutingPolicy};
use routesim::routing::{route, RouteParams};

fn kleinberg_graph(size: usize, degree: u32, seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut degrees = FixedDegreeSource::new(degree);
    let nodes = Graph::generate_nodes(size, &mut rng, true, &mut degrees);
    Graph::connect_standard(nodes, &mut rng, &KleinbergLinkSource, true)
}

fn params(routing: RoutingPolicy, folding: FoldingPolicy, max_htl: u32) -> RouteParams {
    RouteParams {
        routing_policy: routing,
        folding_policy: folding,
        max_htl,
        lookahead: 1,
        lookback: 0,
        new_fold_rule: false,
        significant_digits: 0,
        random_chance: 0.0,
    }
}

/// Route a batch of requests the way the driver does, bootstrap
/// included, and return the number of successes.
fn run_batch(graph: &mut Graph, seed: u64, n_requests: u64, params: &RouteParams) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut successes = 0;
    for request_id in 1..=n_requests {
        let origin = rng.gen_range(0..graph.size());
        let target = rng.gen_range(0..graph.size());
        let result = route(graph, &mut rng, origin, target, request_id, params);

        if result.success {
            successes += 1;
            assert!(result.path_length() as u32 <= params.max_htl);
            assert!(result.travel_length <= params.max_htl);
        } else {
            assert!(result.routing_path.is_empty());
        }

        let mut disconnected: VecDeque<usize> =
            result.folding.disconnected.iter().copied().collect();
        while let Some(node) = disconnected.pop_front() {
            for additional in graph.bootstrap(node, &mut rng) {
                disconnected.push_back(additional);
            }
        }
    }
    successes
}

#[test]
fn folding_and_bootstrap_conserve_edge_count() {
    let mut graph = kleinberg_graph(200, 6, 21);
    let before = graph.n_edges();

    let successes = run_batch(
        &mut graph,
        22,
        500,
        &params(RoutingPolicy::Backtracking, FoldingPolicy::Freenet, 40),
    );

    // Folding swaps connections and bootstrapping swaps them back in,
    // so the edge count never drifts.
    assert_eq!(graph.n_edges(), before);
    assert!(successes > 0);
}

#[test]
fn same_seed_gives_identical_runs() {
    let mut first = kleinberg_graph(150, 6, 31);
    let mut second = kleinberg_graph(150, 6, 31);
    assert!(first.equal(&second));

    let p = params(RoutingPolicy::Backtracking, FoldingPolicy::Freenet, 40);
    let successes_first = run_batch(&mut first, 32, 300, &p);
    let successes_second = run_batch(&mut second, 32, 300, &p);

    assert_eq!(successes_first, successes_second);
    assert!(first.equal(&second));
}

#[test]
fn backtracking_routes_most_requests_on_a_small_world() {
    let mut graph = kleinberg_graph(200, 8, 41);
    let successes = run_batch(
        &mut graph,
        42,
        400,
        &params(RoutingPolicy::Backtracking, FoldingPolicy::None, 60),
    );
    // A Kleinberg small world with this much hop budget routes nearly
    // everything; anything below half signals a broken selector.
    assert!(successes > 200, "only {} of 400 requests succeeded", successes);
}

#[test]
fn greedy_walks_the_ring_to_a_nearby_target() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut degrees = FixedDegreeSource::new(2);
    let nodes = Graph::generate_nodes(32, &mut rng, true, &mut degrees);
    let mut graph = Graph::from_nodes(nodes);
    graph.add_lattice_links(false);

    let p = params(RoutingPolicy::Greedy, FoldingPolicy::None, 32);
    let result = route(&mut graph, &mut rng, 0, 5, 1, &p);

    assert!(result.success);
    assert_eq!(result.routing_path, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(result.travel_length, 6);
}

/// Nine nodes at locations 0.1 through 0.9, wired so greedy routing
/// runs into dead ends that only backtracking can recover from.
fn backtracking_fixture() -> Graph {
    let nodes = (0..9)
        .map(|i| routesim::graph::node::Node::new(i, (i + 1) as f64 / 10.0, 3))
        .collect();
    let mut graph = Graph::from_nodes(nodes);
    for (a, b) in [
        (0, 4),
        (0, 5),
        (0, 6),
        (4, 1),
        (1, 6),
        (5, 2),
        (5, 3),
        (3, 8),
        (8, 7),
    ] {
        graph.connect(a, b);
    }
    graph
}

#[test]
fn backtracking_travel_exceeds_surviving_path() {
    let mut graph = backtracking_fixture();
    let mut rng = StdRng::seed_from_u64(0);

    // 0.1 to 0.3: one dead-ended branch, then success via 0.6.
    let result = route(
        &mut graph,
        &mut rng,
        0,
        2,
        1,
        &params(RoutingPolicy::Backtracking, FoldingPolicy::None, 6),
    );
    assert!(result.success);
    assert_eq!(result.routing_path, vec![0, 5, 2]);
    assert_eq!(result.travel_length, 6);

    // 0.1 to 0.8 needs all eight hops; seven are not enough.
    let result = route(
        &mut graph,
        &mut rng,
        0,
        7,
        2,
        &params(RoutingPolicy::Backtracking, FoldingPolicy::None, 7),
    );
    assert!(!result.success);
    assert_eq!(result.travel_length, 7);

    let result = route(
        &mut graph,
        &mut rng,
        0,
        7,
        3,
        &params(RoutingPolicy::Backtracking, FoldingPolicy::None, 8),
    );
    assert!(result.success);
    assert_eq!(result.routing_path, vec![0, 5, 3, 8, 7]);
    assert_eq!(result.travel_length, 8);
}

#[test]
#[should_panic(expected = "hop budget")]
fn zero_hop_budget_is_rejected() {
    let mut graph = backtracking_fixture();
    let mut rng = StdRng::seed_from_u64(0);
    route(
        &mut graph,
        &mut rng,
        0,
        2,
        1,
        &params(RoutingPolicy::Greedy, FoldingPolicy::None, 0),
    );
}

#[test]
fn new_fold_rule_keeps_nodes_at_their_desired_degree() {
    let mut graph = kleinberg_graph(150, 6, 51);
    let desired: Vec<u32> = graph
        .nodes()
        .iter()
        .map(|node| node.desired_degree)
        .collect();

    let mut p = params(RoutingPolicy::Backtracking, FoldingPolicy::Freenet, 40);
    p.new_fold_rule = true;
    run_batch(&mut graph, 52, 500, &p);

    for (index, node) in graph.nodes().iter().enumerate() {
        assert!(
            node.degree() as u32 <= desired[index],
            "node {} grew past its desired degree",
            index
        );
    }
}
