use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use routesim::formats::{binary, dot, gml};
use routesim::graph::degree::{
    ConformingDegreeSource, DegreeSource, FixedDegreeSource, PoissonDegreeSource,
};
use routesim::graph::linklength::{
    ConformingLinkSource, KleinbergLinkSource, LinkLengthSource, UniformLinkSource,
};
use routesim::graph::Graph;
use routesim::policy::{FoldingPolicy, RoutingPolicy};
use routesim::probe::probe_distribution;
use routesim::routing::{route, RouteParams};
use routesim::stats::{self, RoutingExperiment};

/// Small-world overlay routing simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed for the pseudorandom number generator; a run is fully
    /// determined by its seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of nodes when generating a topology
    #[arg(long)]
    size: Option<usize>,

    /// Space node locations evenly instead of drawing them at random
    #[arg(long)]
    fast_location: bool,

    /// Load a binary graph snapshot
    #[arg(long, value_name = "PATH")]
    load_graph: Option<PathBuf>,

    /// Load a graph from DOT edge lines
    #[arg(long, value_name = "PATH")]
    load_dot: Option<PathBuf>,

    /// Load a graph from GML
    #[arg(long, value_name = "PATH")]
    load_gml: Option<PathBuf>,

    /// Directed lattice with the given number of shortcut edges per
    /// node, drawn from the link length distribution
    #[arg(long, value_name = "SHORTCUTS")]
    sandberg: Option<u32>,

    /// Connect every node to a single central node
    #[arg(long)]
    supernode: bool,

    /// Start from undirected ring links before adding shortcuts
    #[arg(long)]
    lattice: bool,

    /// Every node wants exactly this degree
    #[arg(long, value_name = "N")]
    degree_fixed: Option<u32>,

    /// Degrees drawn from a Poisson distribution with this mean
    #[arg(long, value_name = "MEAN")]
    degree_poisson: Option<f64>,

    /// Degrees drawn from a "<degree> <occurrences>" histogram file
    #[arg(long, value_name = "FILE")]
    degree_conforming: Option<PathBuf>,

    /// Kleinberg's ideal link length distribution, proportional to 1/d
    #[arg(long)]
    link_ideal: bool,

    /// Uniformly random link lengths
    #[arg(long)]
    link_flat: bool,

    /// Link lengths drawn from a histogram file
    #[arg(long, value_name = "FILE")]
    link_conforming: Option<PathBuf>,

    /// Route the given number of requests
    #[arg(long, value_name = "N")]
    route: Option<u64>,

    /// Hop budget per request; required with --route
    #[arg(long, value_name = "HOPS")]
    route_hops: Option<u32>,

    /// File for the routing report; required with --route
    #[arg(long, value_name = "FILE")]
    route_output: Option<PathBuf>,

    /// JSON copy of the routing tallies
    #[arg(long, value_name = "FILE")]
    route_json: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = RoutingPolicy::Backtracking)]
    route_policy: RoutingPolicy,

    #[arg(long, value_enum, default_value_t = FoldingPolicy::Freenet)]
    fold_policy: FoldingPolicy,

    /// Hops of neighbor knowledge used when ranking candidates
    #[arg(long, default_value_t = 1)]
    lookahead: u32,

    /// Loop detection window; zero checks the whole request instead
    #[arg(long, default_value_t = 0)]
    lookback: u32,

    /// Fold with the open-capacity rule instead of the LRU swap rule
    #[arg(long)]
    new_folding: bool,

    /// Decimal digits kept of far-lookahead locations under the
    /// precision-loss policy
    #[arg(long, default_value_t = 2)]
    significant_digits: u32,

    /// Chance per hop of routing to a random neighbor instead of the
    /// policy's choice
    #[arg(long, default_value_t = 0.0)]
    random_chance: f64,

    /// Reconnect nodes disconnected by path folding
    #[arg(long)]
    bootstrap: bool,

    /// Run random-walk probes with the given hop budget
    #[arg(long, value_name = "HOPS")]
    probe: Option<u32>,

    /// Directory for probe distribution output; required with --probe
    #[arg(long, value_name = "DIR")]
    probe_output: Option<PathBuf>,

    /// Apply the Metropolis-Hastings degree correction to probe walks
    #[arg(long)]
    metropolis_hastings: bool,

    /// File for the final degree histogram
    #[arg(long, value_name = "FILE")]
    degree_output: Option<PathBuf>,

    /// File for the final link length distribution
    #[arg(long, value_name = "FILE")]
    link_output: Option<PathBuf>,

    /// Leave ring links out of the link length output
    #[arg(long)]
    exclude_lattice: bool,

    /// Save the final graph as a binary snapshot
    #[arg(long, value_name = "FILE")]
    save_graph: Option<PathBuf>,

    /// Save the final graph as DOT
    #[arg(long, value_name = "FILE")]
    save_dot: Option<PathBuf>,

    /// Save the final graph as GML
    #[arg(long, value_name = "FILE")]
    save_gml: Option<PathBuf>,
}

/// The single topology source a run uses.
#[derive(Debug)]
enum Generator {
    LoadBinary(PathBuf),
    LoadDot(PathBuf),
    LoadGml(PathBuf),
    Sandberg(u32),
    Supernode,
    Standard,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let generator = validate(&args)?;
    debug!("{:?}", args);

    let mut graph = generate_graph(&args, &generator)
        .wrap_err("building the topology")?;
    info!("Initial graph stats\n{}", stats::graph_stats(&graph));

    if let Some(max_hops) = args.probe {
        // Fresh generator so probe behavior depends only on the seed,
        // not on how much randomness graph generation consumed.
        let mut rng = StdRng::seed_from_u64(args.seed);
        let output = args.probe_output.as_ref().expect("validated with --probe");
        probe_distribution(
            &graph,
            &mut rng,
            max_hops,
            output,
            !args.metropolis_hastings,
        )?;
    }

    if let Some(n_requests) = args.route {
        let mut rng = StdRng::seed_from_u64(args.seed);
        simulate(&mut graph, &mut rng, &args, n_requests)?;
    }

    info!("Final graph stats\n{}", stats::graph_stats(&graph));

    if let Some(path) = &args.degree_output {
        let mut writer = BufWriter::new(
            File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?,
        );
        stats::write_degree_histogram(&graph, &mut writer)?;
    }
    if let Some(path) = &args.link_output {
        let mut writer = BufWriter::new(
            File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?,
        );
        stats::write_link_lengths(&graph, &mut writer, args.exclude_lattice)?;
    }

    if let Some(path) = &args.save_graph {
        binary::write(&graph, path)?;
    }
    if let Some(path) = &args.save_dot {
        dot::write(&graph, path)?;
    }
    if let Some(path) = &args.save_gml {
        gml::write(&graph, path)?;
    }

    Ok(())
}

/// Reject ambiguous or incomplete combinations before any simulation
/// starts.
fn validate(args: &Args) -> Result<Generator> {
    let degree_options = [
        args.degree_fixed.is_some(),
        args.degree_poisson.is_some(),
        args.degree_conforming.is_some(),
    ]
    .iter()
    .filter(|&&set| set)
    .count();

    let link_options = [
        args.link_ideal,
        args.link_flat,
        args.link_conforming.is_some(),
    ]
    .iter()
    .filter(|&&set| set)
    .count();

    if degree_options > 1 {
        bail!("at most one of --degree-fixed, --degree-poisson, --degree-conforming");
    }
    if link_options > 1 {
        bail!("at most one of --link-ideal, --link-flat, --link-conforming");
    }

    let mut generators = Vec::new();
    if let Some(path) = &args.load_graph {
        generators.push(Generator::LoadBinary(path.clone()));
    }
    if let Some(path) = &args.load_dot {
        generators.push(Generator::LoadDot(path.clone()));
    }
    if let Some(path) = &args.load_gml {
        generators.push(Generator::LoadGml(path.clone()));
    }
    if args.supernode {
        generators.push(Generator::Supernode);
    }
    if let Some(shortcuts) = args.sandberg {
        if link_options != 1 {
            bail!("--sandberg needs a --link-* distribution for its shortcuts");
        }
        if degree_options != 0 {
            bail!("--sandberg draws no degrees; drop the --degree-* option");
        }
        generators.push(Generator::Sandberg(shortcuts));
    }
    if degree_options == 1 && link_options == 1 && args.sandberg.is_none() {
        generators.push(Generator::Standard);
    }

    let generator = match generators.len() {
        1 => generators.remove(0),
        0 => bail!(
            "no graph generator specified; use --load-graph/--load-dot/--load-gml, \
             --sandberg with --link-*, --supernode, or a --degree-* plus --link-* pair"
        ),
        _ => bail!("more than one graph generator specified"),
    };

    let loads = matches!(
        generator,
        Generator::LoadBinary(_) | Generator::LoadDot(_) | Generator::LoadGml(_)
    );
    if !loads && args.size.is_none() {
        bail!("--size is required when generating a topology");
    }

    if args.route.is_some() {
        if args.route_hops.is_none() {
            bail!("--route was specified, but not --route-hops");
        }
        if args.route_output.is_none() {
            bail!("--route was specified, but not --route-output");
        }
    }
    if args.probe.is_some() && args.probe_output.is_none() {
        bail!("--probe was specified, but not --probe-output");
    }

    Ok(generator)
}

fn degree_source(args: &Args) -> Result<Box<dyn DegreeSource>> {
    Ok(if let Some(path) = &args.degree_conforming {
        Box::new(ConformingDegreeSource::from_path(path)?)
    } else if let Some(mean) = args.degree_poisson {
        Box::new(PoissonDegreeSource::new(mean))
    } else if let Some(degree) = args.degree_fixed {
        Box::new(FixedDegreeSource::new(degree))
    } else {
        Box::new(FixedDegreeSource::new(0))
    })
}

fn link_source(args: &Args) -> Result<Box<dyn LinkLengthSource>> {
    Ok(if let Some(path) = &args.link_conforming {
        Box::new(ConformingLinkSource::from_path(path)?)
    } else if args.link_flat {
        Box::new(UniformLinkSource)
    } else {
        Box::new(KleinbergLinkSource)
    })
}

fn generate_graph(args: &Args, generator: &Generator) -> Result<Graph> {
    let mut rng = StdRng::seed_from_u64(args.seed);

    let graph = match generator {
        Generator::LoadBinary(path) => binary::read(path)?,
        Generator::LoadDot(path) => dot::read(path)?,
        Generator::LoadGml(path) => gml::read(path)?,
        generator => {
            let size = args.size.expect("validated for generated topologies");
            let mut degrees = degree_source(args)?;
            let nodes =
                Graph::generate_nodes(size, &mut rng, args.fast_location, degrees.as_mut());
            match generator {
                Generator::Sandberg(shortcuts) => {
                    Graph::connect_sandberg(nodes, *shortcuts, link_source(args)?.as_ref(), &mut rng)
                }
                Generator::Supernode => Graph::connect_supernode(nodes, args.lattice),
                Generator::Standard => Graph::connect_standard(
                    nodes,
                    &mut rng,
                    link_source(args)?.as_ref(),
                    args.lattice,
                ),
                _ => unreachable!("load generators are handled above"),
            }
        }
    };
    Ok(graph)
}

fn simulate(
    graph: &mut Graph,
    rng: &mut dyn RngCore,
    args: &Args,
    n_requests: u64,
) -> Result<()> {
    let max_htl = args.route_hops.expect("validated with --route");
    let output_path = args.route_output.as_ref().expect("validated with --route");

    let params = RouteParams {
        routing_policy: args.route_policy,
        folding_policy: args.fold_policy,
        max_htl,
        lookahead: args.lookahead,
        lookback: args.lookback,
        new_fold_rule: args.new_folding,
        significant_digits: args.significant_digits,
        random_chance: args.random_chance,
    };

    info!(
        "routing {} requests, {} hops, {:?}/{:?}",
        n_requests, max_htl, args.route_policy, args.fold_policy
    );
    let before_stats = stats::graph_stats(graph);

    let mut experiment = RoutingExperiment::new(max_htl, n_requests);
    for request_id in 1..=n_requests {
        let origin = rng.gen_range(0..graph.size());
        // Targets are node locations rather than arbitrary points, so
        // arrival is detectable by exact location equality.
        let target = rng.gen_range(0..graph.size());

        let result = route(graph, rng, origin, target, request_id, &params);
        experiment.record(result.success, result.path_length() as u32);
        experiment.folding_operations(result.folding.folding_operations);

        // Nodes disconnected by folding get to rejoin. Bootstrapping
        // keeps total connection counts constant by swapping, so it
        // can disconnect further nodes; the queue chases them all.
        let mut disconnected: VecDeque<usize> = result.folding.disconnected.iter().copied().collect();
        experiment.disconnected_folding(disconnected.len() as u64);
        while args.bootstrap {
            let Some(node) = disconnected.pop_front() else {
                break;
            };
            for additional in graph.bootstrap(node, rng) {
                disconnected.push_back(additional);
                experiment.disconnected_bootstrap();
            }
        }
    }

    let mut writer = BufWriter::new(
        File::create(output_path)
            .wrap_err_with(|| format!("creating {}", output_path.display()))?,
    );
    write!(writer, "{}", experiment)?;
    write!(writer, "\nGraph initial stats\n{}", before_stats)?;
    write!(writer, "\n\nFinal graph stats\n{}", stats::graph_stats(graph))?;
    writer.flush()?;

    if let Some(path) = &args.route_json {
        let file = File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &experiment)?;
    }
    info!(
        "routing finished: {}/{} successful",
        experiment.successes(),
        n_requests
    );
    Ok(())
}
