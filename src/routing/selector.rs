//! Next-hop candidate ranking.
//!
//! All selection variants share the same multi-level lookahead scan:
//! level 1 entries are direct neighbors, level `k + 1` entries are the
//! neighbors of level-`k` endpoints, each recorded with the direct
//! neighbor a request would actually be forwarded to. The variants
//! differ only in how candidate distances are computed and which
//! candidates are admissible.

use std::collections::BTreeMap;

use rand::{Rng, RngCore};

use crate::graph::location;
use crate::graph::node::CacheEntry;
use crate::graph::Graph;

/// A routable candidate: the distance from its endpoint to the target,
/// the direct neighbor to forward through, and the lookahead level the
/// endpoint was discovered at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEntry {
    pub distance: f64,
    pub next: usize,
    pub endpoint: usize,
    pub level: u32,
}

/// Peer selection variants. Constructed per request; the request id
/// is threaded in rather than read from shared state.
#[derive(Debug, Clone, Copy)]
pub enum PeerSelector {
    /// Forward only to candidates strictly closer than the current
    /// node; a local minimum ends the route.
    Greedy,
    /// Skip candidates that have already routed this request. With
    /// `lookback` of zero the check is a per-node request-id marker;
    /// otherwise only the trailing `lookback` hops of the path are
    /// consulted.
    LoopDetection { lookback: u32, request_id: u64 },
    /// Loop detection where locations seen at lookahead level two or
    /// deeper have been truncated to a fixed number of decimal digits.
    PrecisionLoss {
        lookback: u32,
        request_id: u64,
        significant_digits: u32,
    },
}

impl PeerSelector {
    /// Distance from a candidate's location to the target, as seen
    /// from the routing node. Under precision loss, locations beyond
    /// the direct neighborhood are known only imprecisely.
    fn candidate_distance(&self, candidate_location: f64, level: u32, target: f64) -> f64 {
        match *self {
            PeerSelector::PrecisionLoss {
                significant_digits, ..
            } if level >= 2 => {
                location::distance(location::truncate(candidate_location, significant_digits), target)
            }
            _ => location::distance(candidate_location, target),
        }
    }

    /// Rank every candidate within `lookahead` hops by distance to the
    /// target, ascending. When the routing cache is enabled the
    /// candidate set is reused across targets; distances are always
    /// recomputed.
    pub fn get_distances(
        &self,
        graph: &mut Graph,
        from: usize,
        target: f64,
        lookahead: u32,
        cache_enabled: bool,
        rng: &mut dyn RngCore,
    ) -> Vec<DistanceEntry> {
        if cache_enabled {
            if let Some(cached) = graph.node(from).cached_entries(lookahead) {
                let mut entries: Vec<DistanceEntry> = cached
                    .iter()
                    .map(|entry| DistanceEntry {
                        distance: self.candidate_distance(
                            graph.node(entry.endpoint).location,
                            entry.level,
                            target,
                        ),
                        next: entry.next,
                        endpoint: entry.endpoint,
                        level: entry.level,
                    })
                    .collect();
                entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                return entries;
            }
        }

        let mut entries: Vec<DistanceEntry> = graph
            .node(from)
            .neighbors
            .iter()
            .map(|&peer| DistanceEntry {
                distance: self.candidate_distance(graph.node(peer).location, 1, target),
                next: peer,
                endpoint: peer,
                level: 1,
            })
            .collect();

        for level in 1..lookahead {
            // Group this level's expansion by endpoint; duplicate
            // endpoints reachable through different neighbors are
            // resolved by picking one representative at random.
            let mut next_level: BTreeMap<usize, Vec<DistanceEntry>> = BTreeMap::new();
            for entry in entries.iter().filter(|e| e.level == level) {
                for &peer in &graph.node(entry.endpoint).neighbors {
                    next_level.entry(peer).or_default().push(DistanceEntry {
                        distance: self.candidate_distance(
                            graph.node(peer).location,
                            level + 1,
                            target,
                        ),
                        next: entry.next,
                        endpoint: peer,
                        level: level + 1,
                    });
                }
            }

            for (endpoint, candidates) in next_level {
                // An endpoint already listed was found at a lower
                // level, which means a shorter forwarding path.
                if entries.iter().any(|e| e.endpoint == endpoint) {
                    continue;
                }
                entries.push(candidates[rng.gen_range(0..candidates.len())]);
            }
        }

        entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        if cache_enabled {
            let cache: Vec<CacheEntry> = entries
                .iter()
                .map(|entry| CacheEntry {
                    next: entry.next,
                    endpoint: entry.endpoint,
                    level: entry.level,
                })
                .collect();
            graph.node_mut(from).set_cache(cache, lookahead);
        }

        entries
    }

    /// Pick the next hop from `from` toward `target`. Returns `from`
    /// itself when no admissible candidate exists.
    pub fn select_peer(
        &self,
        graph: &mut Graph,
        from: usize,
        target: f64,
        lookahead: u32,
        path: &[usize],
        cache_enabled: bool,
        rng: &mut dyn RngCore,
    ) -> usize {
        let distances = self.get_distances(graph, from, target, lookahead, cache_enabled, rng);

        match *self {
            PeerSelector::Greedy => {
                let closest = location::distance(graph.node(from).location, target);
                match distances.first() {
                    Some(best) if best.distance < closest => best.next,
                    _ => from,
                }
            }
            PeerSelector::LoopDetection {
                lookback,
                request_id,
            }
            | PeerSelector::PrecisionLoss {
                lookback,
                request_id,
                ..
            } => {
                for entry in &distances {
                    if !self.already_routed(graph, entry.next, path, lookback, request_id) {
                        return entry.next;
                    }
                }
                from
            }
        }
    }

    fn already_routed(
        &self,
        graph: &Graph,
        candidate: usize,
        path: &[usize],
        lookback: u32,
        request_id: u64,
    ) -> bool {
        if lookback < 1 {
            return graph.node(candidate).last_routed == request_id;
        }
        let window_start = path.len().saturating_sub(lookback as usize);
        path[window_start..].contains(&candidate)
    }
}
