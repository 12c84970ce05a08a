//! Selection among admissible equilibrium states.

use netsel_types::EquilibriumState;

/// View over the admissible equilibrium states for one slot.
///
/// Candidate order is meaningful: when several candidates are equally cheap
/// to reach, the earliest one listed wins. A fixed candidate list therefore
/// always selects the same target for the same observed counts.
pub struct EquilibriumCatalog<'a> {
    candidates: &'a [EquilibriumState],
}

impl<'a> EquilibriumCatalog<'a> {
    pub fn new(candidates: &'a [EquilibriumState]) -> Self {
        Self { candidates }
    }

    /// Number of candidate states.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The candidate at `index`, if it exists.
    pub fn candidate(&self, index: usize) -> Option<&'a EquilibriumState> {
        self.candidates.get(index)
    }

    /// Index of the candidate the observed counts already match, if any.
    pub fn matching(&self, counts: &[u32]) -> Option<usize> {
        self.candidates
            .iter()
            .position(|candidate| candidate.matches(counts))
    }

    /// Devices that must arrive somewhere for `counts` to become `candidate`.
    ///
    /// Only under-target networks contribute; a network at or above its
    /// target costs nothing, since its surplus is what the arrivals drain.
    pub fn move_cost(candidate: &EquilibriumState, counts: &[u32]) -> u64 {
        candidate
            .0
            .iter()
            .zip(counts)
            .map(|(&target, &current)| u64::from(target.saturating_sub(current)))
            .sum()
    }

    /// Index of the cheapest candidate to reach from `counts`.
    ///
    /// A later candidate displaces the running best only when strictly
    /// cheaper, so ties resolve to the earliest candidate. Returns `None`
    /// when the catalog is empty.
    pub fn select_best_target(&self, counts: &[u32]) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (index, candidate) in self.candidates.iter().enumerate() {
            let cost = Self::move_cost(candidate, counts);
            match best {
                Some((_, best_cost)) if cost >= best_cost => {}
                _ => best = Some((index, cost)),
            }
        }
        best.map(|(index, _)| index)
    }
}
