//! Trace files: recorded selections in, distance tables out.
//!
//! A selection recorder writes one `network.csv` per run with rows
//! `run, slot, phase, count x K, rate x K, set x K`, where each set column
//! holds the devices on one network (`"{1, 2, 3}"`, or `set()` when empty).
//! Replay turns those rows back into slot snapshots, taking rates from the
//! scenario definition and cross-checking the recorded counts against the
//! recorded sets. Distance tables are plain two-column CSVs.

use indexmap::IndexSet;
use netsel_scenario::Scenario;
use netsel_types::{DeviceId, RunId, SlotSnapshot, TimeSlot};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Columns before the per-network groups: run, slot, phase.
const LEADING_FIELDS: usize = 3;

/// Error raised while reading trace files or distance tables.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row did not parse or contradicted itself.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A discovery scan came up empty.
    #[error("no {kind} found under {path}")]
    Missing { kind: &'static str, path: PathBuf },
}

fn malformed(path: &Path, line: usize, reason: impl Into<String>) -> TraceError {
    TraceError::Malformed {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn read_file(path: &Path) -> Result<String, TraceError> {
    fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Split one CSV row, honoring double-quoted fields.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Parse a recorded device set: `{1, 2, 3}`, or `set()` when empty.
fn parse_device_set(field: &str) -> Result<IndexSet<DeviceId>, String> {
    let field = field.trim();
    if field == "set()" {
        return Ok(IndexSet::new());
    }
    let inner = field
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| format!("malformed device set `{field}`"))?;
    let mut devices = IndexSet::new();
    for token in inner.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let id: u32 = token
            .parse()
            .map_err(|_| format!("bad device id `{token}`"))?;
        devices.insert(DeviceId(id));
    }
    Ok(devices)
}

/// Read one run's recorded selections into per-slot snapshots.
///
/// Data rates come from the scenario definition, not the file; the recorded
/// counts are cross-checked against the recorded device sets. A header row at
/// the top of the file is skipped.
pub fn read_network_trace(
    path: impl AsRef<Path>,
    scenario: &Scenario,
) -> Result<Vec<SlotSnapshot>, TraceError> {
    let path = path.as_ref();
    let contents = read_file(path)?;
    let num_networks = scenario.num_networks();
    let expected = LEADING_FIELDS + 3 * num_networks;

    let mut snapshots = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_row(line);
        if number == 1 && fields[0].trim().parse::<u32>().is_err() {
            continue;
        }
        if fields.len() != expected {
            return Err(malformed(
                path,
                number,
                format!("expected {expected} fields, found {}", fields.len()),
            ));
        }
        let slot = fields[1]
            .trim()
            .parse::<u64>()
            .map(TimeSlot)
            .map_err(|_| malformed(path, number, format!("bad time slot `{}`", fields[1])))?;

        let mut members = Vec::with_capacity(num_networks);
        for network in 0..num_networks {
            let count_field = &fields[LEADING_FIELDS + network];
            let count: u32 = count_field
                .trim()
                .parse()
                .map_err(|_| malformed(path, number, format!("bad device count `{count_field}`")))?;
            let set_field = &fields[LEADING_FIELDS + 2 * num_networks + network];
            let devices =
                parse_device_set(set_field).map_err(|reason| malformed(path, number, reason))?;
            if devices.len() as u32 != count {
                return Err(malformed(
                    path,
                    number,
                    format!(
                        "network {} records count {count} but lists {} devices",
                        network + 1,
                        devices.len()
                    ),
                ));
            }
            members.push(devices);
        }

        let snapshot = SlotSnapshot::new(slot, scenario.rates(slot).to_vec(), members)
            .map_err(|err| malformed(path, number, err.to_string()))?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

/// Locate `run<r>/network.csv` traces under `dir`, ordered by run.
pub fn discover_trace_runs(dir: impl AsRef<Path>) -> Result<Vec<(RunId, PathBuf)>, TraceError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| TraceError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut runs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| TraceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(run) = name
            .to_str()
            .and_then(|name| name.strip_prefix("run"))
            .and_then(|digits| digits.parse::<u32>().ok())
        else {
            continue;
        };
        let trace = entry.path().join("network.csv");
        if trace.is_file() {
            runs.push((RunId(run), trace));
        }
    }
    if runs.is_empty() {
        return Err(TraceError::Missing {
            kind: "run traces",
            path: dir.to_path_buf(),
        });
    }
    runs.sort_by_key(|&(run, _)| run);
    Ok(runs)
}

/// File name of one run's distance table.
pub fn distance_file_name(run: RunId) -> String {
    format!("distance_run{run}.csv")
}

/// Write a per-slot distance table with a `time_slot,distance` header.
pub fn write_distance_table(
    path: impl AsRef<Path>,
    rows: &[(TimeSlot, f64)],
) -> Result<(), std::io::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "time_slot,distance")?;
    for (slot, distance) in rows {
        writeln!(writer, "{slot},{distance}")?;
    }
    writer.flush()
}

/// Write a per-cycle reduction with a `cycle_offset,distance` header.
pub fn write_cycle_table(
    path: impl AsRef<Path>,
    rows: &[(u64, f64)],
) -> Result<(), std::io::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "cycle_offset,distance")?;
    for (offset, distance) in rows {
        writeln!(writer, "{offset},{distance}")?;
    }
    writer.flush()
}

/// Read a distance table written by [`write_distance_table`].
pub fn read_distance_table(path: impl AsRef<Path>) -> Result<Vec<(TimeSlot, f64)>, TraceError> {
    let path = path.as_ref();
    let contents = read_file(path)?;

    let mut rows = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let number = index + 1;
        let line = line.trim();
        if line.is_empty() || (number == 1 && line.starts_with("time_slot")) {
            continue;
        }
        let (slot, distance) = line
            .split_once(',')
            .ok_or_else(|| malformed(path, number, "expected `time_slot,distance`"))?;
        let slot = slot
            .trim()
            .parse::<u64>()
            .map(TimeSlot)
            .map_err(|_| malformed(path, number, format!("bad time slot `{slot}`")))?;
        let distance = distance
            .trim()
            .parse::<f64>()
            .map_err(|_| malformed(path, number, format!("bad distance `{distance}`")))?;
        rows.push((slot, distance));
    }
    Ok(rows)
}

/// Locate `distance_run<r>.csv` tables under `dir`, ordered by run.
pub fn discover_distance_tables(
    dir: impl AsRef<Path>,
) -> Result<Vec<(RunId, PathBuf)>, TraceError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| TraceError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tables = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| TraceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(run) = name
            .to_str()
            .and_then(|name| name.strip_prefix("distance_run"))
            .and_then(|rest| rest.strip_suffix(".csv"))
            .and_then(|digits| digits.parse::<u32>().ok())
        else {
            continue;
        };
        tables.push((RunId(run), entry.path()));
    }
    if tables.is_empty() {
        return Err(TraceError::Missing {
            kind: "distance tables",
            path: dir.to_path_buf(),
        });
    }
    tables.sort_by_key(|&(run, _)| run);
    Ok(tables)
}
