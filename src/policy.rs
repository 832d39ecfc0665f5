//! Routing and path folding policy selection.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the next hop is chosen while routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingPolicy {
    /// Route to a neighbor strictly closer to the target; stop at a
    /// local minimum.
    Greedy,
    /// Skip candidates that already routed this request.
    LoopDetection,
    /// Loop detection plus retrying from earlier hops when a branch
    /// dead-ends.
    Backtracking,
    /// Backtracking where locations seen through lookahead have lost
    /// decimal precision.
    PrecisionLoss,
}

/// How the topology rewires after a successful request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FoldingPolicy {
    /// No rewiring.
    None,
    /// Fold along the successful path toward its endpoint.
    Freenet,
    /// Shortcut rewiring; first two connections are the undirected
    /// lattice and stay untouched.
    Sandberg,
    /// Shortcut rewiring over directed edges; the first connection is
    /// the lattice and stays untouched.
    SandbergDirected,
    /// Shortcut rewiring with no protected lattice connections.
    SandbergNoLattice,
}

impl FoldingPolicy {
    /// Protected lattice connections at the front of each neighbor
    /// list under the Sandberg policies.
    pub fn lattice_links(self) -> Option<usize> {
        match self {
            FoldingPolicy::Sandberg => Some(2),
            FoldingPolicy::SandbergDirected => Some(1),
            FoldingPolicy::SandbergNoLattice => Some(0),
            _ => None,
        }
    }
}
