//! Sources of shortcut edge endpoints for topology generation.
//!
//! A source samples a target link *distance* and resolves it to the
//! node whose location is closest to the origin's location offset by
//! that distance, in a random direction around the ring. Resolution is
//! a binary search over the location-sorted arena.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use rand::{Rng, RngCore};

use crate::graph::location;
use crate::graph::node::Node;

/// Picks a shortcut endpoint for a node being wired.
pub trait LinkLengthSource {
    fn peer_for(&self, from: &Node, nodes: &[Node], rng: &mut dyn RngCore) -> usize;
}

/// Index of the node whose location is closest to `from.location`
/// offset by `distance` in a random direction. `nodes` must be sorted
/// by location.
fn closest_to(from: &Node, nodes: &[Node], distance: f64, rng: &mut dyn RngCore) -> usize {
    debug_assert!(!nodes.is_empty());
    let offset = if rng.gen::<bool>() { distance } else { -distance };
    let target = location::wrap(from.location + offset);

    // First node at or above the target location, wrapping past the end.
    let above = nodes.partition_point(|n| n.location < target) % nodes.len();
    let below = (above + nodes.len() - 1) % nodes.len();

    if location::distance(nodes[above].location, target)
        <= location::distance(nodes[below].location, target)
    {
        above
    } else {
        below
    }
}

/// Kleinberg's ideal small-world distribution: link distance density
/// proportional to 1/d on [1/n, 0.5], sampled log-uniformly.
#[derive(Debug, Clone, Copy, Default)]
pub struct KleinbergLinkSource;

impl LinkLengthSource for KleinbergLinkSource {
    fn peer_for(&self, from: &Node, nodes: &[Node], rng: &mut dyn RngCore) -> usize {
        let min = 1.0 / nodes.len() as f64;
        let log_min = min.ln();
        let log_max = 0.5f64.ln();
        let distance = (log_min + rng.gen::<f64>() * (log_max - log_min)).exp();
        closest_to(from, nodes, distance, rng)
    }
}

/// Link distances uniform on (0, 0.5].
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformLinkSource;

impl LinkLengthSource for UniformLinkSource {
    fn peer_for(&self, from: &Node, nodes: &[Node], rng: &mut dyn RngCore) -> usize {
        let distance = rng.gen::<f64>() * 0.5;
        closest_to(from, nodes, distance, rng)
    }
}

/// Link distances drawn uniformly from an observed lengths file; the
/// first whitespace-separated value of each line is the length.
#[derive(Debug, Clone)]
pub struct ConformingLinkSource {
    lengths: Vec<f64>,
}

impl ConformingLinkSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("opening link length distribution {}", path.display()))?;
        let mut lengths = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.wrap_err("reading link length distribution")?;
            if line.trim().is_empty() {
                continue;
            }
            let length: f64 = line
                .split_whitespace()
                .next()
                .ok_or_else(|| eyre!("line {}: missing length", number + 1))?
                .parse()
                .wrap_err_with(|| format!("line {}: bad length", number + 1))?;
            lengths.push(length);
        }
        if lengths.is_empty() {
            return Err(eyre!(
                "link length distribution {} contains no entries",
                path.display()
            ));
        }
        Ok(ConformingLinkSource { lengths })
    }
}

impl LinkLengthSource for ConformingLinkSource {
    fn peer_for(&self, from: &Node, nodes: &[Node], rng: &mut dyn RngCore) -> usize {
        let distance = self.lengths[rng.gen_range(0..self.lengths.len())];
        closest_to(from, nodes, distance, rng)
    }
}
