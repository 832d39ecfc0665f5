//! Experiment tallies and report rendering.

use std::fmt;
use std::io::Write;

use color_eyre::Result;
use serde::Serialize;

use crate::graph::Graph;

/// Running tallies for a batch of routing requests.
#[derive(Debug, Serialize)]
pub struct RoutingExperiment {
    n_requests: u64,
    successes: u64,
    disconnected_folding: u64,
    disconnected_bootstrap: u64,
    folding_operations: u64,
    total_success_path_length: u64,
    /// Histogram of successful path lengths, indexed by length. A
    /// success never travels further than the hop budget.
    path_length_dist: Vec<u64>,
}

impl RoutingExperiment {
    pub fn new(max_htl: u32, n_requests: u64) -> Self {
        RoutingExperiment {
            n_requests,
            successes: 0,
            disconnected_folding: 0,
            disconnected_bootstrap: 0,
            folding_operations: 0,
            total_success_path_length: 0,
            path_length_dist: vec![0; max_htl as usize + 1],
        }
    }

    pub fn record(&mut self, success: bool, path_length: u32) {
        if success {
            self.successes += 1;
            self.path_length_dist[path_length as usize] += 1;
            self.total_success_path_length += u64::from(path_length);
        }
    }

    pub fn disconnected_folding(&mut self, count: u64) {
        self.disconnected_folding += count;
    }

    pub fn disconnected_bootstrap(&mut self) {
        self.disconnected_bootstrap += 1;
    }

    pub fn folding_operations(&mut self, operations: u32) {
        self.folding_operations += u64::from(operations);
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }
}

impl fmt::Display for RoutingExperiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Routing simulation results")?;
        writeln!(f)?;
        writeln!(
            f,
            "Disconnected from folding :       \t{}",
            self.disconnected_folding
        )?;
        writeln!(
            f,
            "Disconnected from bootstrapping : \t{}",
            self.disconnected_bootstrap
        )?;
        writeln!(
            f,
            "Path folding operations :         \t{}",
            self.folding_operations
        )?;
        writeln!(
            f,
            "Routing success rate :            \t{}%",
            self.successes as f64 / self.n_requests as f64 * 100.0
        )?;
        writeln!(
            f,
            "Routing requests count :          \t{}",
            self.n_requests
        )?;
        writeln!(
            f,
            "\tSuccessful routing request count : \t{}",
            self.successes
        )?;
        writeln!(
            f,
            "\tFailed routing request count :     \t{}",
            self.n_requests - self.successes
        )?;
        writeln!(f)?;
        writeln!(f, "* Note failed requests are not included in the stats below *")?;
        writeln!(f)?;
        writeln!(
            f,
            "Mean successful path length :     \t{}",
            self.total_success_path_length as f64 / self.n_requests as f64
        )?;
        writeln!(f)?;
        writeln!(f, "Successful Request Path Length Distribution")?;
        writeln!(f, "Length Count")?;
        for (length, count) in self.path_length_dist.iter().enumerate() {
            writeln!(f, "{} {}", length, count)?;
        }
        Ok(())
    }
}

/// Mean, spread, and upper percentiles of a sample set.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub pct50: f64,
    pub pct90: f64,
    pub pct97: f64,
    pub pct99: f64,
}

/// Summarize a distribution. Percentiles are taken from the sorted
/// samples by rank truncation.
pub fn summarize(samples: &[f64]) -> DistributionSummary {
    assert!(!samples.is_empty(), "cannot summarize an empty sample set");
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let sum_squares = sorted.iter().map(|s| s * s).sum::<f64>();
    let variance = sum_squares / n - mean * mean;

    let pct = |fraction: f64| sorted[(sorted.len() as f64 * fraction) as usize];

    DistributionSummary {
        mean,
        std_dev: variance.max(0.0).sqrt(),
        pct50: pct(0.5),
        pct90: pct(0.9),
        pct97: pct(0.97),
        pct99: pct(0.99),
    }
}

impl fmt::Display for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean:\t\t\t{}", self.mean)?;
        writeln!(f, "Std Dev:\t\t{}", self.std_dev)?;
        writeln!(f, "50th percentile:\t{}", self.pct50)?;
        writeln!(f, "90th percentile:\t{}", self.pct90)?;
        writeln!(f, "97th percentile:\t{}", self.pct97)?;
        writeln!(f, "99th percentile:\t{}", self.pct99)?;
        Ok(())
    }
}

/// `"<degree> <count>"` lines from zero through the maximum degree.
pub fn write_degree_histogram(graph: &Graph, writer: &mut dyn Write) -> Result<()> {
    let mut counts = vec![0u64; graph.max_degree() + 1];
    for degree in graph.degrees() {
        counts[degree] += 1;
    }
    for (degree, count) in counts.iter().enumerate() {
        writeln!(writer, "{} {}", degree, count)?;
    }
    Ok(())
}

/// One `"<length> <1/n>"` line per edge, gnuplot CDF input.
pub fn write_link_lengths(
    graph: &Graph,
    writer: &mut dyn Write,
    exclude_lattice: bool,
) -> Result<()> {
    let lengths = graph.edge_lengths(exclude_lattice);
    let normalized = 1.0 / lengths.len() as f64;
    for length in lengths {
        writeln!(writer, "{} {}", length, normalized)?;
    }
    Ok(())
}

/// Human-readable block of graph-level statistics.
pub fn graph_stats(graph: &Graph) -> String {
    let mut block = String::from("Graph stats:");
    block.push_str(&format!("\nSize:\t\t\t\t{}", graph.size()));
    block.push_str(&format!("\nEdges:\t\t\t\t{}", graph.n_edges()));
    block.push_str(&format!("\nMin degree:\t\t\t{}", graph.min_degree()));
    block.push_str(&format!("\nMax degree:\t\t\t{}", graph.max_degree()));
    block.push_str(&format!("\nMean degree:\t\t\t{}", graph.mean_degree()));
    block.push_str(&format!(
        "\nDegree stddev:\t\t\t{}",
        graph.degree_variance().max(0.0).sqrt()
    ));
    block.push_str(&format!(
        "\nMean local clustering coefficient:\t{}",
        graph.mean_local_cluster_coeff()
    ));
    block.push_str(&format!(
        "\nGlobal clustering coefficient:\t\t{}",
        graph.global_cluster_coeff()
    ));
    block
}
