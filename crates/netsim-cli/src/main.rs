//! `netsim` — drive a topology file through the engine to completion,
//! emitting node text output and (optionally) a stats CSV along the way
//! (§6 External interfaces).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use netsim_core::time::usecs_from_str;
use netsim_core::TopologyRecord;
use netsim_engine::{build_topology, StatsSink};

const DEFAULT_STATS_PERIOD_STR: &str = "10s";

#[derive(Parser, Debug)]
#[command(name = "netsim", author, version, about = "Discrete-event data-link simulator")]
struct Args {
    /// Topology JSON file.
    topology: PathBuf,

    /// Cap the run at this much virtual time (e.g. "500ms", "10s").
    #[arg(short = 'e', long = "execution-duration")]
    execution_duration: Option<String>,

    /// Where node `print` output goes; defaults to standard output.
    #[arg(long = "node-output")]
    node_output: Option<PathBuf>,

    /// Suppress all node `print` output.
    #[arg(long = "silent-nodes", default_value_t = false)]
    silent_nodes: bool,

    /// Interval between stats CSV rows.
    #[arg(long = "stats-period")]
    stats_period: Option<String>,

    /// Where to write the stats CSV; omit to disable stats collection.
    #[arg(long = "stats-csv")]
    stats_csv: Option<PathBuf>,

    /// Seed the PRNG for a reproducible run; omitted means OS entropy.
    #[arg(short = 'S', long = "seed")]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let topology_text = std::fs::read_to_string(&args.topology)
        .with_context(|| format!("failed to read topology file {}", args.topology.display()))?;
    let record: TopologyRecord = serde_json::from_str(&topology_text)
        .with_context(|| format!("failed to parse topology file {}", args.topology.display()))?;

    let make_node = netsim_nodes::lookup(&record.module)
        .with_context(|| format!("failed to import module {:?}", record.module))?;

    let duration_usec = args
        .execution_duration
        .as_deref()
        .map(usecs_from_str)
        .transpose()
        .with_context(|| "invalid --execution-duration".to_string())?;

    let stats_period_usec = usecs_from_str(
        args.stats_period.as_deref().unwrap_or(DEFAULT_STATS_PERIOD_STR),
    )
    .with_context(|| "invalid --stats-period".to_string())?;

    let stats_sink = args
        .stats_csv
        .as_ref()
        .map(|path| -> Result<StatsSink> {
            let file = File::create(path)
                .with_context(|| format!("failed to create stats CSV file {}", path.display()))?;
            let sink: StatsSink = StatsSink::new(Box::new(file))
                .with_context(|| format!("failed to write stats CSV header to {}", path.display()))?;
            Ok(sink)
        })
        .transpose()?;

    let node_output: Box<dyn Write + Send> = match &args.node_output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create node-output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };

    let built = build_topology(&record, |_index| make_node())
        .with_context(|| format!("failed to build topology from {}", args.topology.display()))?;

    info!(nodes = built.nodes.len(), links = built.links.len(), "topology built");

    let mut sim = netsim_engine::Simulator::new(
        built.nodes,
        built.links,
        args.seed,
        duration_usec,
        stats_period_usec,
        stats_sink,
        node_output,
        args.silent_nodes,
    );

    sim.boot().context("node REBOOT handler failed")?;
    sim.run_to_completion().context("simulation aborted")?;

    info!(time_usec = sim.current_time_usec(), "simulation complete");
    Ok(())
}
