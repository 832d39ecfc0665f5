//! Graph arena and topology construction.
//!
//! Nodes are stored in a single `Vec` and refer to each other by index,
//! sorted by location so that index order is location order. All edge
//! mutation goes through the graph so that neighbor lists, recency
//! queues, and routing caches stay consistent on both endpoints.

pub mod degree;
pub mod folding;
pub mod linklength;
pub mod location;
pub mod lru;
pub mod node;

use std::collections::HashSet;

use log::{info, warn};
use rand::{Rng, RngCore};

use crate::graph::degree::DegreeSource;
use crate::graph::linklength::LinkLengthSource;
use crate::graph::node::Node;

/// Probability of rejecting a connection attempt to a node already at
/// its desired degree; also scales the stop probability used while
/// wiring the standard topology.
pub const REJECT_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Graph { nodes }
    }

    /// Generate `count` nodes with locations sorted ascending so that
    /// node index order is location order. Even placement spaces
    /// locations exactly `1/count` apart; otherwise locations are drawn
    /// uniformly at random.
    pub fn generate_nodes(
        count: usize,
        rng: &mut dyn RngCore,
        even_spacing: bool,
        degrees: &mut dyn DegreeSource,
    ) -> Vec<Node> {
        let mut locations: Vec<f64> = if even_spacing {
            (0..count).map(|i| i as f64 / count as f64).collect()
        } else {
            (0..count).map(|_| rng.gen::<f64>()).collect()
        };
        locations.sort_by(|a, b| a.total_cmp(b));

        locations
            .into_iter()
            .enumerate()
            .map(|(i, loc)| Node::new(i, loc, degrees.next_degree(rng)))
            .collect()
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Form an undirected connection between two nodes.
    pub fn connect(&mut self, a: usize, b: usize) {
        self.connect_outgoing(a, b);
        self.connect_outgoing(b, a);
    }

    /// Form a directed connection from one node to another.
    pub fn connect_outgoing(&mut self, from: usize, to: usize) {
        assert_ne!(from, to, "cannot connect a node to itself");
        assert!(
            !self.nodes[from].is_connected(to),
            "nodes {} and {} are already connected",
            from,
            to
        );
        self.nodes[from].neighbors.push(to);
        self.nodes[from].recency.push(to);
        self.peer_changed(from);
    }

    /// Remove an undirected connection. The initiating node's success
    /// streak resets; it can no longer claim room for extra peers on
    /// the strength of a topology that just changed under it.
    pub fn disconnect(&mut self, initiator: usize, other: usize) {
        self.nodes[initiator].reset_streak();
        self.disconnect_outgoing(initiator, other);
        self.disconnect_outgoing(other, initiator);
    }

    pub fn disconnect_outgoing(&mut self, from: usize, to: usize) {
        assert_ne!(from, to, "cannot disconnect a node from itself");
        assert!(
            self.nodes[from].is_connected(to),
            "nodes {} and {} are not connected",
            from,
            to
        );
        self.nodes[from].neighbors.retain(|&n| n != to);
        self.nodes[from].recency.remove(to);
        self.peer_changed(from);
    }

    /// Invalidate routing caches within the changed node's lookahead
    /// radius. Everything whose cache could have seen the changed edge
    /// must recompute.
    fn peer_changed(&mut self, origin: usize) {
        let mut stack = vec![(origin, self.nodes[origin].cache_lookahead())];
        while let Some((index, hops)) = stack.pop() {
            self.nodes[index].clear_cache();
            if hops < 1 {
                continue;
            }
            for &neighbor in &self.nodes[index].neighbors {
                stack.push((neighbor, hops - 1));
            }
        }
    }

    /// Drop a random connection of `node` and connect it to `peer`
    /// instead, keeping `node`'s degree invariant. Returns the
    /// disconnected neighbor.
    pub fn swap_connections(&mut self, node: usize, peer: usize, rng: &mut dyn RngCore) -> usize {
        assert!(self.nodes[node].degree() > 0, "no connection to drop");
        let dropped = self.nodes[node].neighbors[rng.gen_range(0..self.nodes[node].degree())];

        let initial = self.nodes[node].degree()
            + self.nodes[dropped].degree()
            + self.nodes[peer].degree();

        self.disconnect(node, dropped);
        self.connect(node, peer);

        debug_assert_eq!(
            initial,
            self.nodes[node].degree()
                + self.nodes[dropped].degree()
                + self.nodes[peer].degree()
        );

        dropped
    }

    /// Give `node` random connections until it reaches its desired
    /// degree. Candidate peers swap out one of their own connections so
    /// the total edge count stays invariant; peers already at degree
    /// refuse a small fraction of offers. Returns the nodes left with
    /// zero connections by the swaps.
    pub fn bootstrap(&mut self, node: usize, rng: &mut dyn RngCore) -> Vec<usize> {
        let mut disconnected = Vec::new();
        let max_attempts = self.size() * 64;
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            if attempts > max_attempts {
                warn!(
                    "giving up bootstrapping node {} at degree {} of {} after {} draws",
                    node,
                    self.nodes[node].degree(),
                    self.nodes[node].desired_degree,
                    attempts - 1
                );
                break;
            }

            let peer = rng.gen_range(0..self.size());
            // Do not connect to self, duplicate an existing connection,
            // or adopt a disconnected node lest it fragment the network.
            let eligible = peer != node
                && !self.nodes[node].is_connected(peer)
                && self.nodes[peer].degree() > 0;

            if eligible
                && (!self.nodes[peer].at_degree() || rng.gen::<f64>() > REJECT_PROBABILITY)
            {
                let dropped = self.swap_connections(peer, node, rng);
                if self.nodes[dropped].degree() == 0 {
                    disconnected.push(dropped);
                }
            }

            if self.nodes[node].at_degree() {
                break;
            }
        }

        disconnected
    }

    /// Connect node `(i + 1) % n` to node `i` for every index, forming
    /// a ring in location order. Must run before any other edges exist.
    pub fn add_lattice_links(&mut self, directed: bool) {
        assert_eq!(self.n_edges(), 0, "lattice links must be added first");
        assert!(self.size() > 1);

        for i in 0..self.size() {
            let from = (i + 1) % self.size();
            if directed {
                self.connect_outgoing(from, i);
            } else {
                self.connect(from, i);
            }
        }

        assert_eq!(self.n_edges(), self.size());
    }

    /// Wire undirected shortcut edges until each node is at its desired
    /// degree or gives up. The stop probability rises with each attempt
    /// so over-constrained nodes do not spin forever.
    pub fn connect_standard(
        nodes: Vec<Node>,
        rng: &mut dyn RngCore,
        links: &dyn LinkLengthSource,
        lattice: bool,
    ) -> Graph {
        let mut graph = Graph::from_nodes(nodes);
        if lattice {
            graph.add_lattice_links(false);
        }

        for src in 0..graph.size() {
            if graph.nodes[src].at_degree() {
                continue;
            }

            let stop_step = REJECT_PROBABILITY / graph.nodes[src].desired_degree as f64;
            let mut stop_prob = 0.0;
            while !graph.nodes[src].at_degree() && rng.gen::<f64>() > stop_prob {
                stop_prob += stop_step;
                let dest = links.peer_for(&graph.nodes[src], &graph.nodes, rng);
                if dest == src
                    || graph.nodes[src].is_connected(dest)
                    || graph.nodes[dest].at_degree()
                {
                    continue;
                }
                graph.connect(src, dest);
            }
        }

        info!(
            "wired standard topology: {} nodes, {} edges",
            graph.size(),
            graph.n_edges()
        );
        graph
    }

    /// Directed ring plus a fixed number of directed shortcuts per
    /// node, endpoints drawn from the link length source.
    pub fn connect_sandberg(
        nodes: Vec<Node>,
        shortcuts: u32,
        links: &dyn LinkLengthSource,
        rng: &mut dyn RngCore,
    ) -> Graph {
        let mut graph = Graph::from_nodes(nodes);
        graph.add_lattice_links(true);

        for origin in 0..graph.size() {
            // -1 accounts for the single lattice edge.
            while graph.nodes[origin].degree() - 1 < shortcuts as usize {
                let endpoint = loop {
                    let candidate = links.peer_for(&graph.nodes[origin], &graph.nodes, rng);
                    if candidate != origin && !graph.nodes[origin].is_connected(candidate) {
                        break candidate;
                    }
                };
                graph.connect_outgoing(origin, endpoint);
            }
        }

        info!(
            "wired Sandberg topology: {} nodes, {} shortcuts per node",
            graph.size(),
            shortcuts
        );
        graph
    }

    /// Every node gets a single undirected connection to node 0,
    /// ignoring desired degrees.
    pub fn connect_supernode(nodes: Vec<Node>, lattice: bool) -> Graph {
        let mut graph = Graph::from_nodes(nodes);
        assert!(graph.size() > 1);
        if lattice {
            graph.add_lattice_links(false);
        }

        for peer in 1..graph.size() {
            if !graph.nodes[0].is_connected(peer) {
                graph.connect(0, peer);
            }
        }

        graph
    }

    /// Count edges, treating a mutual pair of directed edges as one.
    pub fn n_edges(&self) -> usize {
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for origin in &self.nodes {
            for &peer in &origin.neighbors {
                let key = if origin.index < peer {
                    (origin.index, peer)
                } else {
                    (peer, origin.index)
                };
                seen.insert(key);
            }
        }
        seen.len()
    }

    pub fn min_degree(&self) -> usize {
        self.nodes.iter().map(Node::degree).min().unwrap_or(0)
    }

    pub fn max_degree(&self) -> usize {
        self.nodes.iter().map(Node::degree).max().unwrap_or(0)
    }

    pub fn mean_degree(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        (2 * self.n_edges()) as f64 / self.size() as f64
    }

    pub fn degrees(&self) -> Vec<usize> {
        self.nodes.iter().map(Node::degree).collect()
    }

    pub fn degree_variance(&self) -> f64 {
        let n = self.size() as f64;
        if self.nodes.is_empty() {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for node in &self.nodes {
            let d = node.degree() as f64;
            sum += d;
            sum_sq += d * d;
        }
        sum_sq / n - (sum * sum) / (n * n)
    }

    /// Lengths of all directed edges, optionally skipping links between
    /// adjacent indexes.
    pub fn edge_lengths(&self, exclude_lattice: bool) -> Vec<f64> {
        let mut lengths = Vec::new();
        for node in &self.nodes {
            for &peer in &node.neighbors {
                if exclude_lattice
                    && (node.index == (peer + 1) % self.size()
                        || peer == (node.index + 1) % self.size())
                {
                    continue;
                }
                lengths.push(location::distance(node.location, self.nodes[peer].location));
            }
        }
        lengths
    }

    /// Closed triplets centered on a node; the numerator of its local
    /// clustering coefficient.
    pub fn closed_triplets(&self, index: usize) -> usize {
        let neighbors = &self.nodes[index].neighbors;
        if neighbors.len() < 2 {
            return 0;
        }
        let mut closed = 0;
        for i in 0..neighbors.len() {
            for j in (i + 1)..neighbors.len() {
                if self.nodes[neighbors[i]].is_connected(neighbors[j]) {
                    closed += 1;
                }
            }
        }
        closed
    }

    pub fn local_cluster_coeff(&self, index: usize) -> f64 {
        let degree = self.nodes[index].degree();
        if degree < 2 {
            return 0.0;
        }
        self.closed_triplets(index) as f64 / ((degree * (degree - 1)) / 2) as f64
    }

    /// Unweighted mean of the local clustering coefficients. Gives
    /// undue weight to low-degree nodes; not the global coefficient.
    pub fn mean_local_cluster_coeff(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let sum: f64 = (0..self.size()).map(|i| self.local_cluster_coeff(i)).sum();
        let mean = sum / self.size() as f64;
        debug_assert!((0.0..=1.0).contains(&mean));
        mean
    }

    pub fn global_cluster_coeff(&self) -> f64 {
        let mut closed = 0usize;
        let mut total = 0usize;
        for i in 0..self.size() {
            let degree = self.nodes[i].degree();
            closed += self.closed_triplets(i);
            total += (degree * (degree - 1)) / 2;
        }
        if total == 0 {
            return 0.0;
        }
        closed as f64 / total as f64
    }

    /// Trace of a random walk: first element is the origin, last the
    /// endpoint. Non-uniform walks apply a Metropolis-Hastings
    /// correction for high-degree bias; a rejected step consumes a hop
    /// without leaving the current node.
    pub fn random_walk_list(
        &self,
        origin: usize,
        mut hops: u32,
        uniform: bool,
        rng: &mut dyn RngCore,
    ) -> Vec<usize> {
        let mut list = vec![origin];
        let mut current = origin;

        while hops > 0 {
            let node = &self.nodes[current];
            assert!(node.degree() > 0, "random walk reached an isolated node");

            let next = if uniform {
                node.neighbors[rng.gen_range(0..node.degree())]
            } else {
                let mut candidate = current;
                while hops > 0 && candidate == current {
                    candidate = node.neighbors[rng.gen_range(0..node.degree())];
                    let beta = node.degree() as f64 / self.nodes[candidate].degree() as f64;
                    if rng.gen::<f64>() > beta {
                        // Rejected; the walk stays here for this hop.
                        candidate = current;
                        hops -= 1;
                        if hops > 0 {
                            list.push(current);
                        }
                    }
                }
                if hops == 0 {
                    // Budget ran out while rejecting: endpoint is here.
                    list.push(current);
                    return list;
                }
                candidate
            };

            hops -= 1;
            list.push(next);
            current = next;
        }

        list
    }

    /// Endpoint of a random walk starting at `origin`.
    pub fn random_walk(
        &self,
        origin: usize,
        hops: u32,
        uniform: bool,
        rng: &mut dyn RngCore,
    ) -> usize {
        *self
            .random_walk_list(origin, hops, uniform, rng)
            .last()
            .unwrap_or(&origin)
    }

    /// Structural equality: same node count, and per index the same
    /// location, desired degree, and neighbor set. Recency and cache
    /// state are ignored.
    pub fn equal(&self, other: &Graph) -> bool {
        if self.size() != other.size() {
            return false;
        }
        for (a, b) in self.nodes.iter().zip(other.nodes.iter()) {
            if a.location != b.location
                || a.desired_degree != b.desired_degree
                || a.degree() != b.degree()
            {
                return false;
            }
            let peers: HashSet<usize> = b.neighbors.iter().copied().collect();
            if !a.neighbors.iter().all(|n| peers.contains(n)) {
                return false;
            }
        }
        true
    }
}
