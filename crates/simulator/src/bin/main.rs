//! Command-line driver for distance-to-equilibrium simulations.

use clap::{Parser, Subcommand};
use netsel_engine::DistanceMode;
use netsel_scenario::{Scenario, ScenarioError};
use netsel_simulator::{stats, trace, SimulationReport, Simulator, SimulatorConfig};
use netsel_types::{DeviceId, TimeSlot};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netsel-sim")]
#[command(about = "Distance-to-equilibrium simulator for network selection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate runs of a uniform random selection workload
    Run {
        /// Built-in scenario name, or path to a scenario TOML file
        #[arg(long, default_value = "static_rates")]
        scenario: String,

        /// Number of independent runs
        #[arg(long, default_value = "5")]
        runs: u32,

        /// Slots per run (defaults to one scenario cycle)
        #[arg(long)]
        slots: Option<u64>,

        /// Base random seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Distance at or below which a slot counts as at equilibrium
        #[arg(long, default_value = "7.5")]
        epsilon: f64,

        /// Report absolute gains instead of percentages
        #[arg(long)]
        absolute: bool,

        /// Restrict distance accounting to these device ids
        #[arg(long, value_delimiter = ',')]
        devices: Vec<u32>,

        /// Directory for per-run and reduced distance tables
        #[arg(long)]
        output: Option<PathBuf>,

        /// Evaluate runs on the rayon thread pool
        #[arg(long)]
        parallel: bool,
    },

    /// Re-evaluate recorded selection traces
    Replay {
        /// Built-in scenario name, or path to a scenario TOML file
        #[arg(long)]
        scenario: String,

        /// Directory holding run<r>/network.csv traces
        #[arg(long)]
        trace_dir: PathBuf,

        /// Distance at or below which a slot counts as at equilibrium
        #[arg(long, default_value = "7.5")]
        epsilon: f64,

        /// Report absolute gains instead of percentages
        #[arg(long)]
        absolute: bool,

        /// Restrict distance accounting to these device ids
        #[arg(long, value_delimiter = ',')]
        devices: Vec<u32>,

        /// Directory for per-run and reduced distance tables
        #[arg(long)]
        output: Option<PathBuf>,

        /// Evaluate runs on the rayon thread pool
        #[arg(long)]
        parallel: bool,
    },

    /// Reduce previously written distance tables
    Aggregate {
        /// Directory holding distance_run<r>.csv tables
        #[arg(long)]
        input: PathBuf,

        /// Where the reduced tables go (defaults to the input directory)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Cycle length in slots; also writes per-cycle reductions
        #[arg(long)]
        cycles: Option<u64>,

        /// Distance at or below which a slot counts as at equilibrium
        #[arg(long, default_value = "7.5")]
        epsilon: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            runs,
            slots,
            seed,
            epsilon,
            absolute,
            devices,
            output,
            parallel,
        } => {
            let scenario = resolve_scenario(&scenario)?;
            let mut config = SimulatorConfig::new(scenario)
                .with_runs(runs)
                .with_seed(seed)
                .with_epsilon(epsilon)
                .with_mode(mode(absolute))
                .with_parallel(parallel);
            if let Some(slots) = slots {
                config = config.with_slots(slots);
            }
            if let Some(output) = output {
                config = config.with_output(output);
            }
            if !devices.is_empty() {
                config = config.with_device_filter(devices.into_iter().map(DeviceId));
            }
            let report = Simulator::new(config).run()?;
            report.print();
        }

        Commands::Replay {
            scenario,
            trace_dir,
            epsilon,
            absolute,
            devices,
            output,
            parallel,
        } => {
            let scenario = resolve_scenario(&scenario)?;
            let mut config = SimulatorConfig::new(scenario)
                .with_epsilon(epsilon)
                .with_mode(mode(absolute))
                .with_parallel(parallel);
            if let Some(output) = output {
                config = config.with_output(output);
            }
            if !devices.is_empty() {
                config = config.with_device_filter(devices.into_iter().map(DeviceId));
            }
            let report = Simulator::new(config).replay(&trace_dir)?;
            report.print();
        }

        Commands::Aggregate {
            input,
            output,
            cycles,
            epsilon,
        } => {
            aggregate(&input, output.as_deref(), cycles, epsilon)?;
        }
    }

    Ok(())
}

fn mode(absolute: bool) -> DistanceMode {
    if absolute {
        DistanceMode::Absolute
    } else {
        DistanceMode::Percentage
    }
}

/// A scenario argument is either a built-in name or a TOML file path.
fn resolve_scenario(arg: &str) -> Result<Scenario, Box<dyn std::error::Error>> {
    let path = Path::new(arg);
    if path.extension().is_some() || path.exists() {
        return Ok(Scenario::load(path)?);
    }
    match Scenario::by_name(arg) {
        Ok(scenario) => Ok(scenario),
        Err(ScenarioError::Unknown(name)) => Err(format!(
            "unknown scenario `{name}`; built-ins are {}",
            Scenario::builtin_names().join(", ")
        )
        .into()),
        Err(other) => Err(other.into()),
    }
}

/// Reduce `distance_run<r>.csv` tables to median/mean tables and a report.
fn aggregate(
    input: &Path,
    output: Option<&Path>,
    cycles: Option<u64>,
    epsilon: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.unwrap_or(input);
    let tables = trace::discover_distance_tables(input)?;
    let mut series = Vec::with_capacity(tables.len());
    for (run, path) in tables {
        series.push((run, trace::read_distance_table(&path)?));
    }

    let rows: Vec<&[(TimeSlot, f64)]> = series.iter().map(|(_, rows)| rows.as_slice()).collect();
    let median = stats::per_slot_reduction(&rows, stats::median);
    let mean = stats::per_slot_reduction(&rows, stats::mean);
    std::fs::create_dir_all(output)?;
    trace::write_distance_table(output.join("distance_median.csv"), &median)?;
    trace::write_distance_table(output.join("distance_mean.csv"), &mean)?;

    if let Some(slots_per_cycle) = cycles {
        trace::write_cycle_table(
            output.join("distance_cycle_median.csv"),
            &stats::per_cycle_reduction(&median, slots_per_cycle, stats::median),
        )?;
        trace::write_cycle_table(
            output.join("distance_cycle_mean.csv"),
            &stats::per_cycle_reduction(&mean, slots_per_cycle, stats::mean),
        )?;
    }

    SimulationReport::from_series(&series, epsilon)?.print();
    Ok(())
}
