//! A single overlay node in the graph arena.

use crate::graph::lru::LruQueue;

/// Consecutive successful requests after which a node considers itself
/// able to take on an additional peer even though it is at its desired
/// degree.
pub const OPEN_STREAK_THRESHOLD: u32 = 10;

/// Cached lookahead entry: a routable candidate reachable through the
/// direct neighbor `next`, terminating at `endpoint`, `level` hops out.
/// Distances are not cached; they depend on the target and are
/// recomputed on every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub next: usize,
    pub endpoint: usize,
    pub level: u32,
}

/// Node in the arena. Neighbors are arena indices; all mutation that
/// touches two nodes at once goes through [`Graph`](crate::graph::Graph)
/// methods so both endpoints stay consistent.
#[derive(Debug, Clone)]
pub struct Node {
    pub index: usize,
    pub location: f64,
    pub desired_degree: u32,
    /// Outgoing connections in insertion order.
    pub neighbors: Vec<usize>,
    /// Recency ordering over `neighbors`; least recently used first.
    pub recency: LruQueue,
    /// Lookahead routing cache; only populated when path folding is
    /// disabled, since folding rewires the topology under the cache.
    cache: Option<Vec<CacheEntry>>,
    /// Lookahead depth the cache was built for. Retained across
    /// invalidation so neighborhood clearing uses a stable radius.
    cache_lookahead: u32,
    /// Consecutive requests this node served on a successful path.
    successful_request_streak: u32,
    /// Identifier of the last request that routed through this node.
    pub last_routed: u64,
}

impl Node {
    pub fn new(index: usize, location: f64, desired_degree: u32) -> Self {
        debug_assert!((0.0..1.0).contains(&location));
        Node {
            index,
            location,
            // A node that wants no peers at all cannot participate.
            desired_degree: desired_degree.max(1),
            neighbors: Vec::new(),
            recency: LruQueue::new(),
            cache: None,
            cache_lookahead: 0,
            successful_request_streak: 0,
            last_routed: 0,
        }
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the node has reached (or exceeded) its desired degree.
    pub fn at_degree(&self) -> bool {
        self.degree() >= self.desired_degree as usize
    }

    pub fn is_connected(&self, other: usize) -> bool {
        self.neighbors.contains(&other)
    }

    /// Whether this node would accept an additional peer: either it is
    /// below its desired degree, or its recent success streak says it
    /// can afford one more.
    pub fn has_open_peer(&self) -> bool {
        !self.at_degree() || self.successful_request_streak >= OPEN_STREAK_THRESHOLD
    }

    /// Least recently used neighbor, re-queued as least recent so the
    /// queue stays intact if the caller decides not to drop it.
    pub fn disconnect_candidate(&mut self) -> Option<usize> {
        let least = self.recency.pop()?;
        self.recency.push_least(least);
        Some(least)
    }

    /// Record that a request routed through this node succeeded.
    pub fn successful_request(&mut self, via: Option<usize>) {
        self.successful_request_streak += 1;
        if let Some(peer) = via {
            debug_assert!(self.is_connected(peer));
            self.recency.push(peer);
        }
    }

    pub fn reset_streak(&mut self) {
        self.successful_request_streak = 0;
    }

    pub fn streak(&self) -> u32 {
        self.successful_request_streak
    }

    /// Cached entries, if the cache is valid for this lookahead depth.
    pub fn cached_entries(&self, lookahead: u32) -> Option<&[CacheEntry]> {
        if self.cache_lookahead != lookahead {
            return None;
        }
        self.cache.as_deref()
    }

    pub fn set_cache(&mut self, entries: Vec<CacheEntry>, lookahead: u32) {
        if self.cache.is_some() && self.cache_lookahead == lookahead {
            return;
        }
        self.cache = Some(entries);
        self.cache_lookahead = lookahead;
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn cache_lookahead(&self) -> u32 {
        self.cache_lookahead
    }
}
