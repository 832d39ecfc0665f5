//! Graph persistence formats: binary snapshots, DOT, and GML.
//!
//! All formats serialize the directed edge list; an undirected
//! connection appears as two directed edges and survives a round trip.
//! Only the binary format carries desired degrees. The text formats
//! reconstruct them as the maximum observed degree, which keeps loaded
//! graphs usable for routing without inventing per-node data.

pub mod binary;
pub mod dot;
pub mod gml;

use thiserror::Error;

use crate::graph::node::Node;
use crate::graph::Graph;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {format} input: {reason}")]
    Malformed {
        format: &'static str,
        reason: String,
    },

    #[error("binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl FormatError {
    fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        FormatError::Malformed {
            format,
            reason: reason.into(),
        }
    }
}

/// Build a graph from `(id, location)` pairs and directed edges read
/// from a text format. Ids must form a contiguous range starting at
/// zero; desired degrees are set to the maximum observed degree.
fn assemble(
    format: &'static str,
    mut nodes: Vec<(usize, f64)>,
    edges: &[(usize, usize)],
) -> Result<Graph, FormatError> {
    nodes.sort_by_key(|&(id, _)| id);
    for (expected, &(id, location)) in nodes.iter().enumerate() {
        if id != expected {
            return Err(FormatError::malformed(
                format,
                format!("node ids are not contiguous at {}", id),
            ));
        }
        if !(0.0..1.0).contains(&location) {
            return Err(FormatError::malformed(
                format,
                format!("node {} location {} outside [0,1)", id, location),
            ));
        }
    }

    let mut out_degree = vec![0u32; nodes.len()];
    for &(from, to) in edges {
        if from >= nodes.len() || to >= nodes.len() {
            return Err(FormatError::malformed(
                format,
                format!("edge {} -> {} references a missing node", from, to),
            ));
        }
        if from == to {
            return Err(FormatError::malformed(
                format,
                format!("self edge on node {}", from),
            ));
        }
        out_degree[from] += 1;
    }
    let desired = out_degree.iter().copied().max().unwrap_or(0);

    let mut graph = Graph::from_nodes(
        nodes
            .into_iter()
            .map(|(id, location)| Node::new(id, location, desired))
            .collect(),
    );
    for &(from, to) in edges {
        if graph.node(from).is_connected(to) {
            return Err(FormatError::malformed(
                format,
                format!("duplicate edge {} -> {}", from, to),
            ));
        }
        graph.connect_outgoing(from, to);
    }

    Ok(graph)
}

/// Every directed edge of the graph as an index pair, origin order.
fn directed_edges(graph: &Graph) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for node in graph.nodes() {
        for &peer in &node.neighbors {
            edges.push((node.index, peer));
        }
    }
    edges
}
