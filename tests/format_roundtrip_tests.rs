//! Cross-format persistence checks on a realistic generated topology.

use rand::rngs::StdRng;
use rand::SeedableRng;

use routesim::formats::{binary, dot, gml, FormatError};
use routesim::graph::degree::FixedDegreeSource;
use routesim::graph::linklength::KleinbergLinkSource;
use routesim::graph::Graph;

fn kleinberg_graph(size: usize, degree: u32, seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut degrees = FixedDegreeSource::new(degree);
    let nodes = Graph::generate_nodes(size, &mut rng, true, &mut degrees);
    Graph::connect_standard(nodes, &mut rng, &KleinbergLinkSource, true)
}

#[test]
fn binary_round_trip_is_identical() {
    let graph = kleinberg_graph(120, 6, 11);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topology.bin");

    binary::write(&graph, &path).unwrap();
    let loaded = binary::read(&path).unwrap();
    assert!(graph.equal(&loaded));
}

#[test]
fn dot_round_trip_preserves_topology() {
    let graph = kleinberg_graph(80, 5, 12);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topology.dot");

    dot::write(&graph, &path).unwrap();
    let loaded = dot::read(&path).unwrap();

    assert_eq!(loaded.size(), graph.size());
    assert_eq!(loaded.n_edges(), graph.n_edges());
    for index in 0..graph.size() {
        assert_eq!(loaded.node(index).location, graph.node(index).location);
        assert_eq!(loaded.node(index).degree(), graph.node(index).degree());
    }
}

#[test]
fn gml_round_trip_preserves_topology() {
    let graph = kleinberg_graph(80, 5, 13);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topology.gml");

    gml::write(&graph, &path).unwrap();
    let loaded = gml::read(&path).unwrap();

    assert_eq!(loaded.size(), graph.size());
    assert_eq!(loaded.n_edges(), graph.n_edges());
    for index in 0..graph.size() {
        assert_eq!(loaded.node(index).location, graph.node(index).location);
        assert_eq!(loaded.node(index).degree(), graph.node(index).degree());
    }
}

#[test]
fn dot_to_gml_conversion_keeps_edges() {
    let graph = kleinberg_graph(60, 4, 14);
    let dir = tempfile::tempdir().unwrap();
    let dot_path = dir.path().join("topology.dot");
    let gml_path = dir.path().join("topology.gml");

    dot::write(&graph, &dot_path).unwrap();
    let via_dot = dot::read(&dot_path).unwrap();
    gml::write(&via_dot, &gml_path).unwrap();
    let via_gml = gml::read(&gml_path).unwrap();

    // The text formats agree with each other exactly.
    assert!(via_dot.equal(&via_gml));
}

#[test]
fn gap_in_node_ids_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sparse.gml");
    std::fs::write(
        &path,
        "graph [\n node [ id 0 location 0.1 ]\n node [ id 2 location 0.2 ]\n]\n",
    )
    .unwrap();
    assert!(matches!(
        gml::read(&path),
        Err(FormatError::Malformed { format: "gml", .. })
    ));
}

#[test]
fn out_of_range_location_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.dot");
    std::fs::write(&path, "digraph G {\n\"1.5 0\" -> \"0.2 1\"\n}\n").unwrap();
    assert!(matches!(
        dot::read(&path),
        Err(FormatError::Malformed { format: "dot", .. })
    ));
}
