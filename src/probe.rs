//! Random-walk reachability experiments.
//!
//! Measures which nodes a probe can see after a given number of hops,
//! against a baseline of uniformly drawn endpoints. Per-trial counts
//! are sorted before accumulation so the output reflects the spread of
//! each run rather than node indices.

use std::fs;
use std::io::Write;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use rand::{Rng, RngCore};

use crate::graph::Graph;

const N_TRIALS: usize = 100;
const PROBES_PER_NODE: usize = 30;

/// Run the probe experiment and write one data file per hop count
/// into `output_dir`, plus a `reference.dat` baseline.
///
/// Each line is `"<rank> <occurrences>"`; occurrences are summed over
/// all trials. With `uniform` set the walk picks neighbors uniformly,
/// otherwise it applies the Metropolis-Hastings degree correction.
pub fn probe_distribution(
    graph: &Graph,
    rng: &mut dyn RngCore,
    max_hops: u32,
    output_dir: &Path,
    uniform: bool,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("creating probe output directory {}", output_dir.display()))?;

    let size = graph.size();
    let n_probes = size * PROBES_PER_NODE;

    info!(
        "probing: {} trials of {} walks, {} hops, {}",
        N_TRIALS,
        n_probes,
        max_hops,
        if uniform {
            "uniform selection"
        } else {
            "degree-corrected selection"
        }
    );

    // Baseline: the same number of endpoints drawn uniformly from the
    // whole network, showing what perfect visibility looks like.
    let mut baseline = vec![0u64; size];
    for _ in 0..N_TRIALS {
        let mut trial = vec![0u64; size];
        for _ in 0..n_probes {
            trial[rng.gen_range(0..size)] += 1;
        }
        trial.sort_unstable();
        accumulate(&mut baseline, &trial);
    }
    write_counts(&baseline, &output_dir.join("reference.dat"))?;

    // One source per trial; every walk records the node it occupies at
    // each hop along the trace, zero hops being the source itself.
    let hops = max_hops as usize;
    let mut occurrences = vec![vec![0u64; size]; hops + 1];
    for _ in 0..N_TRIALS {
        let source = rng.gen_range(0..size);
        let mut trial = vec![vec![0u64; size]; hops + 1];
        for _ in 0..n_probes {
            let trace = graph.random_walk_list(source, max_hops, uniform, rng);
            debug_assert_eq!(trace.len(), hops + 1);
            for (hop, &along) in trace.iter().enumerate() {
                trial[hop][along] += 1;
            }
        }
        for (totals, counts) in occurrences.iter_mut().zip(trial.iter_mut()) {
            counts.sort_unstable();
            accumulate(totals, counts);
        }
    }

    for (hop, counts) in occurrences.iter().enumerate() {
        write_counts(counts, &output_dir.join(format!("probe-{}.dat", hop)))?;
    }
    Ok(())
}

fn accumulate(totals: &mut [u64], counts: &[u64]) {
    debug_assert_eq!(totals.len(), counts.len());
    for (total, count) in totals.iter_mut().zip(counts) {
        *total += count;
    }
}

fn write_counts(counts: &[u64], path: &Path) -> Result<()> {
    let mut out = String::new();
    for (rank, count) in counts.iter().enumerate() {
        out.push_str(&format!("{} {}\n", rank, count));
    }
    fs::File::create(path)
        .and_then(|mut file| file.write_all(out.as_bytes()))
        .wrap_err_with(|| format!("writing {}", path.display()))
}
