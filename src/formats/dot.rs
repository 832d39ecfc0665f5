//! DOT graph format.
//!
//! One line per directed edge: `"<location> <index>" -> "<location>
//! <index>"`. Node attributes beyond location and index are not
//! carried.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use regex::Regex;

use crate::formats::{assemble, directed_edges, FormatError};
use crate::graph::Graph;

pub fn write(graph: &Graph, path: &Path) -> Result<(), FormatError> {
    let edges = directed_edges(graph);
    info!(
        "writing {} directed edges to {}",
        edges.len(),
        path.display()
    );

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "digraph G {{")?;
    for (from, to) in edges {
        writeln!(
            writer,
            "\"{} {}\" -> \"{} {}\"",
            graph.node(from).location,
            from,
            graph.node(to).location,
            to
        )?;
    }
    writeln!(writer, "}}")?;
    writer.flush()?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Graph, FormatError> {
    let edge_line = Regex::new(
        r#"^\s*"([0-9.eE+-]+)\s+(\d+)"\s*->\s*"([0-9.eE+-]+)\s+(\d+)"\s*$"#,
    )
    .expect("edge pattern is valid");

    let mut nodes: Vec<(usize, f64)> = Vec::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();

    let mut record_node = |id: usize, location: f64, nodes: &mut Vec<(usize, f64)>| {
        if !nodes.iter().any(|&(existing, _)| existing == id) {
            nodes.push((id, location));
        }
    };

    for (number, line) in BufReader::new(File::open(path)?).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("digraph") || trimmed == "}" {
            continue;
        }
        let captures = edge_line.captures(trimmed).ok_or_else(|| {
            FormatError::malformed("dot", format!("unparseable line {}", number + 1))
        })?;

        let parse_f64 = |text: &str| {
            text.parse::<f64>().map_err(|_| {
                FormatError::malformed("dot", format!("bad location on line {}", number + 1))
            })
        };
        let parse_usize = |text: &str| {
            text.parse::<usize>().map_err(|_| {
                FormatError::malformed("dot", format!("bad index on line {}", number + 1))
            })
        };

        let from_location = parse_f64(&captures[1])?;
        let from = parse_usize(&captures[2])?;
        let to_location = parse_f64(&captures[3])?;
        let to = parse_usize(&captures[4])?;

        record_node(from, from_location, &mut nodes);
        record_node(to, to_location, &mut nodes);
        edges.push((from, to));
    }

    assemble("dot", nodes, &edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Node;

    #[test]
    fn dot_round_trip_preserves_edges() {
        let nodes = (0..6).map(|i| Node::new(i, i as f64 / 6.0, 2)).collect();
        let mut graph = Graph::from_nodes(nodes);
        graph.add_lattice_links(false);
        graph.connect_outgoing(1, 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.dot");
        write(&graph, &path).unwrap();
        let loaded = read(&path).unwrap();

        assert_eq!(loaded.size(), 6);
        assert_eq!(loaded.n_edges(), graph.n_edges());
        for i in 0..6 {
            assert_eq!(loaded.node(i).location, graph.node(i).location);
        }
        assert!(loaded.node(1).is_connected(4));
        assert!(!loaded.node(4).is_connected(1));
        // Desired degree becomes the largest observed degree.
        assert_eq!(loaded.node(0).desired_degree, 3);
    }

    #[test]
    fn garbage_lines_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.dot");
        std::fs::write(&path, "digraph G {\nnot an edge\n}\n").unwrap();
        assert!(matches!(
            read(&path),
            Err(FormatError::Malformed { format: "dot", .. })
        ));
    }
}
