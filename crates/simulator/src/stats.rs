//! Small-sample statistics for distance series.

use indexmap::IndexMap;
use netsel_types::TimeSlot;

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; the midpoint average for even lengths, `0.0` for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation; `0.0` for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Reduce several per-run series to one value per slot.
///
/// Slots missing from some runs are reduced over the runs that have them.
pub fn per_slot_reduction<S: AsRef<[(TimeSlot, f64)]>>(
    series: &[S],
    reduce: impl Fn(&[f64]) -> f64,
) -> Vec<(TimeSlot, f64)> {
    let mut by_slot: IndexMap<TimeSlot, Vec<f64>> = IndexMap::new();
    for run in series {
        for &(slot, distance) in run.as_ref() {
            by_slot.entry(slot).or_default().push(distance);
        }
    }
    let mut rows: Vec<(TimeSlot, f64)> = by_slot
        .into_iter()
        .map(|(slot, distances)| (slot, reduce(&distances)))
        .collect();
    rows.sort_by_key(|&(slot, _)| slot);
    rows
}

/// Collapse a multi-cycle series to one value per cycle offset.
pub fn per_cycle_reduction(
    series: &[(TimeSlot, f64)],
    slots_per_cycle: u64,
    reduce: impl Fn(&[f64]) -> f64,
) -> Vec<(u64, f64)> {
    let mut by_offset: IndexMap<u64, Vec<f64>> = IndexMap::new();
    for &(slot, distance) in series {
        by_offset
            .entry(slot.cycle_offset(slots_per_cycle))
            .or_default()
            .push(distance);
    }
    let mut rows: Vec<(u64, f64)> = by_offset
        .into_iter()
        .map(|(offset, distances)| (offset, reduce(&distances)))
        .collect();
    rows.sort_by_key(|&(offset, _)| offset);
    rows
}

/// Slots whose distance is at or below `epsilon`.
pub fn equilibrium_slots(series: &[(TimeSlot, f64)], epsilon: f64) -> Vec<TimeSlot> {
    series
        .iter()
        .filter(|&&(_, distance)| distance <= epsilon)
        .map(|&(slot, _)| slot)
        .collect()
}
