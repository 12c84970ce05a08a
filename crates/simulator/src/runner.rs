//! Run orchestration: drive the engine across whole runs and aggregate.

use hdrhistogram::Histogram;
use netsel_engine::DistanceEngine;
use netsel_types::{RunId, SlotSnapshot, TimeSlot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use crate::config::SimulatorConfig;
use crate::error::SimulatorError;
use crate::stats;
use crate::trace;
use crate::workload::UniformSelection;

/// Distance series for one completed run.
type RunSeries = (RunId, Vec<(TimeSlot, f64)>);

/// Drives the distance engine over simulated or recorded runs.
pub struct Simulator {
    config: SimulatorConfig,
    engine: DistanceEngine,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let engine = DistanceEngine::new(config.engine_config());
        Self { config, engine }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Simulate the configured number of synthetic runs.
    pub fn run(&self) -> Result<SimulationReport, SimulatorError> {
        info!(
            scenario = self.config.scenario.name(),
            runs = self.config.runs,
            slots = self.config.slots,
            seed = self.config.seed,
            "starting simulation"
        );
        let runs: Vec<RunId> = (1..=self.config.runs).map(RunId).collect();
        let series = if self.config.parallel {
            runs.par_iter()
                .map(|&run| self.simulate_run(run).map(|rows| (run, rows)))
                .collect::<Result<Vec<RunSeries>, SimulatorError>>()?
        } else {
            runs.iter()
                .map(|&run| self.simulate_run(run).map(|rows| (run, rows)))
                .collect::<Result<Vec<RunSeries>, SimulatorError>>()?
        };
        self.finish(series)
    }

    /// Re-evaluate recorded selection traces found under `trace_dir`.
    pub fn replay(&self, trace_dir: impl AsRef<Path>) -> Result<SimulationReport, SimulatorError> {
        let found = trace::discover_trace_runs(trace_dir)?;
        info!(runs = found.len(), "replaying recorded traces");
        let mut loaded = Vec::with_capacity(found.len());
        for (run, path) in found {
            let snapshots = trace::read_network_trace(&path, &self.config.scenario)?;
            loaded.push((run, snapshots));
        }
        let series = if self.config.parallel {
            loaded
                .par_iter()
                .map(|(run, snapshots)| self.replay_run(*run, snapshots).map(|rows| (*run, rows)))
                .collect::<Result<Vec<RunSeries>, SimulatorError>>()?
        } else {
            loaded
                .iter()
                .map(|(run, snapshots)| self.replay_run(*run, snapshots).map(|rows| (*run, rows)))
                .collect::<Result<Vec<RunSeries>, SimulatorError>>()?
        };
        self.finish(series)
    }

    fn simulate_run(&self, run: RunId) -> Result<Vec<(TimeSlot, f64)>, SimulatorError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed + u64::from(run.0));
        let workload = UniformSelection::new(&self.config.scenario);
        let mut rows = Vec::with_capacity(self.config.slots as usize);
        let mut slot = TimeSlot::FIRST;
        for _ in 0..self.config.slots {
            if self.config.scenario.phase_boundary(slot) {
                debug!(%run, %slot, "entering new phase");
            }
            let snapshot = workload.snapshot(slot, &mut rng)?;
            rows.push(self.evaluate_slot(run, &snapshot)?);
            slot = slot.next();
        }
        info!(%run, slots = rows.len(), "run complete");
        Ok(rows)
    }

    fn replay_run(
        &self,
        run: RunId,
        snapshots: &[SlotSnapshot],
    ) -> Result<Vec<(TimeSlot, f64)>, SimulatorError> {
        let mut rows = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            rows.push(self.evaluate_slot(run, snapshot)?);
        }
        info!(%run, slots = rows.len(), "replay complete");
        Ok(rows)
    }

    fn evaluate_slot(
        &self,
        run: RunId,
        snapshot: &SlotSnapshot,
    ) -> Result<(TimeSlot, f64), SimulatorError> {
        let slot = snapshot.slot();
        let report = self
            .engine
            .evaluate(
                snapshot,
                self.config.scenario.equilibria(slot),
                &self.config.scenario,
            )
            .map_err(|source| {
                error!(%run, %slot, %source, "slot evaluation failed");
                SimulatorError::Engine { run, slot, source }
            })?;
        debug!(
            %run,
            %slot,
            distance = report.distance,
            moves = report.moves.len(),
            "slot evaluated"
        );
        Ok((slot, report.distance))
    }

    /// Write distance tables if an output directory is configured, then
    /// fold every run into the summary report.
    fn finish(&self, series: Vec<RunSeries>) -> Result<SimulationReport, SimulatorError> {
        if let Some(dir) = &self.config.output {
            fs::create_dir_all(dir)?;
            for (run, rows) in &series {
                trace::write_distance_table(dir.join(trace::distance_file_name(*run)), rows)?;
            }
            let tables: Vec<&[(TimeSlot, f64)]> =
                series.iter().map(|(_, rows)| rows.as_slice()).collect();
            trace::write_distance_table(
                dir.join("distance_median.csv"),
                &stats::per_slot_reduction(&tables, stats::median),
            )?;
            trace::write_distance_table(
                dir.join("distance_mean.csv"),
                &stats::per_slot_reduction(&tables, stats::mean),
            )?;
            info!(dir = %dir.display(), runs = series.len(), "wrote distance tables");
        }
        SimulationReport::from_series(&series, self.config.epsilon)
    }
}

/// Aggregate distance statistics over a batch of runs.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Number of runs aggregated.
    pub runs: u32,

    /// Slots in the longest run.
    pub slots: u64,

    /// Equilibrium threshold the report was built with.
    pub epsilon: f64,

    /// Mean distance over every evaluated slot.
    pub mean: f64,

    /// Median distance over every evaluated slot.
    pub median: f64,

    /// 90th percentile distance.
    pub p90: f64,

    /// 99th percentile distance.
    pub p99: f64,

    /// Evaluated slots within `epsilon` of equilibrium, over all runs.
    pub equilibrium_slots: usize,

    /// Evaluated slots over all runs.
    pub total_slots: usize,
}

impl SimulationReport {
    /// Build a report from per-run distance series.
    pub fn from_series(series: &[RunSeries], epsilon: f64) -> Result<Self, SimulatorError> {
        // Distances are recorded in hundredths so the integer histogram
        // keeps two decimal places.
        let mut histogram = Histogram::<u64>::new(3)?;
        let mut distances = Vec::new();
        let mut equilibrium = 0usize;
        for (_, rows) in series {
            equilibrium += stats::equilibrium_slots(rows, epsilon).len();
            for &(_, distance) in rows {
                histogram.saturating_record((distance * 100.0).round() as u64);
                distances.push(distance);
            }
        }
        Ok(Self {
            runs: series.len() as u32,
            slots: series
                .iter()
                .map(|(_, rows)| rows.len() as u64)
                .max()
                .unwrap_or(0),
            epsilon,
            mean: stats::mean(&distances),
            median: stats::median(&distances),
            p90: histogram.value_at_quantile(0.90) as f64 / 100.0,
            p99: histogram.value_at_quantile(0.99) as f64 / 100.0,
            equilibrium_slots: equilibrium,
            total_slots: distances.len(),
        })
    }

    /// Fraction of evaluated slots at or below the epsilon threshold.
    pub fn equilibrium_ratio(&self) -> f64 {
        if self.total_slots == 0 {
            return 0.0;
        }
        self.equilibrium_slots as f64 / self.total_slots as f64
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!("=== Distance Report ===");
        println!("runs:            {}", self.runs);
        println!("slots per run:   {}", self.slots);
        println!("mean distance:   {:.3}", self.mean);
        println!("median distance: {:.3}", self.median);
        println!("p90 distance:    {:.3}", self.p90);
        println!("p99 distance:    {:.3}", self.p99);
        println!(
            "at equilibrium:  {} / {} slots ({:.1}%, epsilon {})",
            self.equilibrium_slots,
            self.total_slots,
            self.equilibrium_ratio() * 100.0,
            self.epsilon
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsel_scenario::Scenario;

    fn small_config(name: &str) -> SimulatorConfig {
        let scenario = Scenario::by_name(name).unwrap();
        SimulatorConfig::new(scenario)
            .with_runs(2)
            .with_slots(20)
            .with_seed(7)
    }

    #[test]
    fn test_run_produces_full_series() {
        let report = Simulator::new(small_config("static_rates")).run().unwrap();
        assert_eq!(report.runs, 2);
        assert_eq!(report.slots, 20);
        assert_eq!(report.total_slots, 40);
        assert!(report.mean >= 0.0);
        assert!(report.p99 >= report.p90);
    }

    #[test]
    fn test_runs_are_deterministic_for_a_seed() {
        let first = Simulator::new(small_config("two_zone")).run().unwrap();
        let second = Simulator::new(small_config("two_zone")).run().unwrap();
        assert_eq!(first.mean, second.mean);
        assert_eq!(first.median, second.median);
        assert_eq!(first.equilibrium_slots, second.equilibrium_slots);
    }

    #[test]
    fn test_parallel_runs_match_sequential() {
        let sequential = Simulator::new(small_config("static_rates")).run().unwrap();
        let parallel = Simulator::new(small_config("static_rates").with_parallel(true))
            .run()
            .unwrap();
        assert_eq!(sequential.mean, parallel.mean);
        assert_eq!(sequential.median, parallel.median);
    }

    #[test]
    fn test_output_tables_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config("static_rates").with_output(dir.path());
        Simulator::new(config).run().unwrap();

        assert!(dir.path().join("distance_run1.csv").is_file());
        assert!(dir.path().join("distance_run2.csv").is_file());
        assert!(dir.path().join("distance_median.csv").is_file());
        assert!(dir.path().join("distance_mean.csv").is_file());

        let rows = trace::read_distance_table(dir.path().join("distance_run1.csv")).unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].0, TimeSlot(1));
    }

    #[test]
    fn test_replay_reads_run_directories() {
        let contents = "\
run,timeslot,phase,count1,count2,count3,rate1,rate2,rate3,set1,set2,set3
1,1,0,1,2,3,4,7,22,{1},\"{2, 3}\",\"{4, 5, 6}\"
1,2,0,6,0,0,4,7,22,\"{1, 2, 3, 4, 5, 6}\",set(),set()
";
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("run1");
        std::fs::create_dir(&run_dir).unwrap();
        std::fs::write(run_dir.join("network.csv"), contents).unwrap();

        let config = SimulatorConfig::new(Scenario::by_name("two_zone").unwrap());
        let report = Simulator::new(config).replay(dir.path()).unwrap();
        assert_eq!(report.runs, 1);
        assert_eq!(report.slots, 2);
        // Slot 1 is recorded exactly at the admissible split, slot 2 far off it.
        assert_eq!(report.equilibrium_slots, 1);
    }
}
