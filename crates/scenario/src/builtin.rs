//! Built-in scenario instances.
//!
//! Canned environments covering the shapes that matter for distance
//! evaluation: fixed rates, rate swings over a working day, a coverage-zone
//! swap, and a nine-network commuter day. All use one-minute slots over a
//! 1440-slot cycle.

use indexmap::IndexSet;
use netsel_types::{AccessTable, DeviceId, EquilibriumState};
use std::ops::RangeInclusive;

use crate::definition::{Phase, Scenario};
use crate::error::ScenarioError;

/// One slot per minute over a 24-hour day.
const SLOTS_PER_DAY: u64 = 1440;

pub(crate) const NAMES: &[&str] = &["static_rates", "office_day", "two_zone", "commuter_day"];

pub(crate) fn by_name(name: &str) -> Result<Scenario, ScenarioError> {
    match name {
        "static_rates" => static_rates(),
        "office_day" => office_day(),
        "two_zone" => two_zone(),
        "commuter_day" => commuter_day(),
        other => Err(ScenarioError::Unknown(other.to_string())),
    }
}

fn devices(ids: RangeInclusive<u32>) -> IndexSet<DeviceId> {
    ids.map(DeviceId).collect()
}

fn nobody() -> IndexSet<DeviceId> {
    IndexSet::new()
}

/// Twenty devices, three networks, fixed rates: a single phase covering the
/// whole day.
fn static_rates() -> Result<Scenario, ScenarioError> {
    let everyone = devices(1..=20);
    Scenario::new(
        "static_rates",
        20,
        SLOTS_PER_DAY,
        vec![Phase {
            start: 0,
            rates: vec![4.0, 7.0, 22.0],
            access: AccessTable::new(vec![everyone.clone(), everyone.clone(), everyone]),
            equilibria: vec![EquilibriumState(vec![2, 4, 14])],
        }],
    )
}

fn office_phase(start: u64, rates: [f64; 3], equilibrium: [u32; 3]) -> Phase {
    let everyone = devices(1..=20);
    Phase {
        start,
        rates: rates.to_vec(),
        access: AccessTable::new(vec![everyone.clone(), everyone.clone(), everyone]),
        equilibria: vec![EquilibriumState(equilibrium.to_vec())],
    }
}

/// Rates shift four times over a working day (morning, mid-day, afternoon,
/// evening) while every device keeps access to all three networks.
fn office_day() -> Result<Scenario, ScenarioError> {
    Scenario::new(
        "office_day",
        20,
        SLOTS_PER_DAY,
        vec![
            office_phase(0, [7.0, 14.0, 44.0], [2, 4, 14]),
            office_phase(360, [36.0, 7.0, 22.0], [11, 2, 7]),
            office_phase(720, [9.0, 16.0, 40.0], [2, 5, 13]),
            office_phase(1080, [40.0, 4.0, 21.0], [13, 1, 6]),
        ],
    )
}

/// Six devices in two coverage zones. From mid-day every device but the
/// first trades access to network 2 for network 3.
fn two_zone() -> Result<Scenario, ScenarioError> {
    let rates = vec![4.0, 7.0, 22.0];
    Scenario::new(
        "two_zone",
        6,
        SLOTS_PER_DAY,
        vec![
            Phase {
                start: 0,
                rates: rates.clone(),
                access: AccessTable::new(vec![devices(1..=6), devices(1..=3), devices(4..=6)]),
                equilibria: vec![EquilibriumState(vec![1, 2, 3])],
            },
            Phase {
                start: 720,
                rates,
                access: AccessTable::new(vec![devices(1..=6), devices(1..=1), devices(2..=6)]),
                equilibria: vec![EquilibriumState(vec![0, 1, 5])],
            },
        ],
    )
}

const COMMUTER_RATES: [f64; 9] = [16.0, 7.0, 44.0, 40.0, 14.0, 22.0, 7.0, 36.0, 18.0];

fn commuter_phase(start: u64, access: Vec<IndexSet<DeviceId>>, equilibrium: [u32; 9]) -> Phase {
    Phase {
        start,
        rates: COMMUTER_RATES.to_vec(),
        access: AccessTable::new(access),
        equilibria: vec![EquilibriumState(equilibrium.to_vec())],
    }
}

fn commuter_travel(start: u64) -> Phase {
    commuter_phase(
        start,
        vec![
            devices(1..=5),
            devices(1..=5),
            devices(1..=5),
            devices(6..=20),
            devices(6..=20),
            nobody(),
            nobody(),
            nobody(),
            nobody(),
        ],
        [1, 0, 4, 11, 4, 0, 0, 0, 0],
    )
}

fn commuter_office(start: u64) -> Phase {
    commuter_phase(
        start,
        vec![
            devices(1..=5),
            devices(1..=5),
            devices(1..=5),
            nobody(),
            nobody(),
            devices(6..=20),
            devices(6..=20),
            devices(6..=20),
            nobody(),
        ],
        [1, 0, 4, 0, 0, 5, 1, 9, 0],
    )
}

/// Twenty devices sharing a hostel; fifteen commute together to an office
/// and back while five stay home. Nine networks, six phases over the day.
fn commuter_day() -> Result<Scenario, ScenarioError> {
    Scenario::new(
        "commuter_day",
        20,
        SLOTS_PER_DAY,
        vec![
            // Overnight and morning at the hostel.
            commuter_phase(
                0,
                vec![
                    devices(1..=20),
                    devices(1..=20),
                    devices(1..=10),
                    nobody(),
                    nobody(),
                    nobody(),
                    nobody(),
                    nobody(),
                    nobody(),
                ],
                [7, 3, 10, 0, 0, 0, 0, 0, 0],
            ),
            // Bus ride to the office.
            commuter_travel(780),
            commuter_office(840),
            // Lunch break near the office.
            commuter_phase(
                1020,
                vec![
                    devices(1..=5),
                    devices(1..=5),
                    devices(1..=5),
                    nobody(),
                    nobody(),
                    devices(6..=10),
                    devices(6..=10),
                    devices(6..=20),
                    devices(11..=20),
                ],
                [1, 0, 4, 0, 0, 4, 1, 7, 3],
            ),
            commuter_office(1080),
            // Bus ride home.
            commuter_travel(1380),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsel_types::{Accessibility, NetworkId, TimeSlot};

    #[test]
    fn test_all_builtins_resolve() {
        for name in Scenario::builtin_names() {
            let scenario = Scenario::by_name(name).unwrap();
            assert_eq!(scenario.name(), *name);
            assert_eq!(scenario.slots_per_cycle(), SLOTS_PER_DAY);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert!(matches!(
            Scenario::by_name("rush_hour"),
            Err(ScenarioError::Unknown(_))
        ));
    }

    #[test]
    fn test_office_day_rate_schedule() {
        let scenario = Scenario::by_name("office_day").unwrap();
        assert_eq!(scenario.num_networks(), 3);
        assert_eq!(scenario.rates(TimeSlot(1)), &[7.0, 14.0, 44.0]);
        assert_eq!(scenario.rates(TimeSlot(361)), &[36.0, 7.0, 22.0]);
        assert!(scenario.phase_boundary(TimeSlot(361)));
        assert_eq!(
            scenario.equilibria(TimeSlot(361)),
            &[EquilibriumState(vec![11, 2, 7])][..]
        );
        // Day two repeats the schedule.
        assert_eq!(scenario.rates(TimeSlot(1441)), &[7.0, 14.0, 44.0]);
    }

    #[test]
    fn test_two_zone_coverage_swap() {
        let scenario = Scenario::by_name("two_zone").unwrap();
        assert!(scenario.can_access(TimeSlot(1), DeviceId(2), NetworkId(2)));
        assert!(!scenario.can_access(TimeSlot(1), DeviceId(2), NetworkId(3)));
        // After the swap only device 1 keeps network 2.
        assert!(scenario.can_access(TimeSlot(721), DeviceId(1), NetworkId(2)));
        assert!(!scenario.can_access(TimeSlot(721), DeviceId(2), NetworkId(2)));
        assert!(scenario.can_access(TimeSlot(721), DeviceId(2), NetworkId(3)));
    }

    #[test]
    fn test_commuter_day_phases() {
        let scenario = Scenario::by_name("commuter_day").unwrap();
        assert_eq!(scenario.num_networks(), 9);
        assert_eq!(scenario.phases().len(), 6);
        // At home the commuters reach only the hostel networks.
        assert!(scenario.can_access(TimeSlot(1), DeviceId(15), NetworkId(1)));
        assert!(!scenario.can_access(TimeSlot(1), DeviceId(15), NetworkId(4)));
        // On the morning bus they lose the hostel and see the road networks.
        let bus = TimeSlot(781);
        assert!(scenario.phase_boundary(bus));
        assert!(!scenario.can_access(bus, DeviceId(15), NetworkId(1)));
        assert!(scenario.can_access(bus, DeviceId(15), NetworkId(4)));
        // The five who stay home keep the hostel networks.
        assert!(scenario.can_access(bus, DeviceId(3), NetworkId(1)));
    }
}
