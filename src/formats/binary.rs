//! Binary graph snapshots.
//!
//! The only format that preserves desired degrees exactly; use it for
//! checkpointing a topology between simulation runs.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::formats::{directed_edges, FormatError};
use crate::graph::node::Node;
use crate::graph::Graph;

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    location: f64,
    desired_degree: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphRecord {
    nodes: Vec<NodeRecord>,
    edges: Vec<(u32, u32)>,
}

pub fn write(graph: &Graph, path: &Path) -> Result<(), FormatError> {
    let record = GraphRecord {
        nodes: graph
            .nodes()
            .iter()
            .map(|node| NodeRecord {
                location: node.location,
                desired_degree: node.desired_degree,
            })
            .collect(),
        edges: directed_edges(graph)
            .into_iter()
            .map(|(from, to)| (from as u32, to as u32))
            .collect(),
    };
    info!(
        "writing {} nodes and {} directed edges to {}",
        record.nodes.len(),
        record.edges.len(),
        path.display()
    );
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, &record)?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Graph, FormatError> {
    let reader = BufReader::new(File::open(path)?);
    let record: GraphRecord = bincode::deserialize_from(reader)?;
    info!(
        "reading {} nodes and {} directed edges from {}",
        record.nodes.len(),
        record.edges.len(),
        path.display()
    );

    for (id, node) in record.nodes.iter().enumerate() {
        if !(0.0..1.0).contains(&node.location) {
            return Err(FormatError::malformed(
                "binary",
                format!("node {} location {} outside [0,1)", id, node.location),
            ));
        }
    }

    let mut graph = Graph::from_nodes(
        record
            .nodes
            .iter()
            .enumerate()
            .map(|(id, node)| Node::new(id, node.location, node.desired_degree))
            .collect(),
    );

    for &(from, to) in &record.edges {
        let (from, to) = (from as usize, to as usize);
        if from >= graph.size() || to >= graph.size() {
            return Err(FormatError::malformed(
                "binary",
                format!("edge {} -> {} references a missing node", from, to),
            ));
        }
        if from == to || graph.node(from).is_connected(to) {
            return Err(FormatError::malformed(
                "binary",
                format!("invalid edge {} -> {}", from, to),
            ));
        }
        graph.connect_outgoing(from, to);
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trip_preserves_structure() {
        let nodes = (0..8).map(|i| Node::new(i, i as f64 / 8.0, 3)).collect();
        let mut graph = Graph::from_nodes(nodes);
        graph.add_lattice_links(false);
        graph.connect(0, 4);
        graph.connect_outgoing(2, 6);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.bin");
        write(&graph, &path).unwrap();
        let loaded = read(&path).unwrap();

        assert!(graph.equal(&loaded));
        assert_eq!(loaded.node(3).desired_degree, 3);
        // The directed edge stayed directed.
        assert!(loaded.node(2).is_connected(6));
        assert!(!loaded.node(6).is_connected(2));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.bin");
        std::fs::write(&path, b"not a snapshot").unwrap();
        assert!(read(&path).is_err());
    }
}
