/// Dispatch sequences whose cycle cost is fixed independently of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleCostKind {
    /// Hardware interrupt entry (`ABORT`, `NMI`, `IRQ`).
    InterruptEntry,
    /// Undefined opcode delivered through the illegal-op vector.
    IllegalEntry,
    /// Undefined opcode treated as a no-op under 32-bit accumulator or `K`.
    CompatNop,
    /// One idle step while parked by `WAI`.
    WaitIdle,
    /// Extra cycle for a taken conditional branch.
    BranchTaken,
    /// Page-fault entry delivered after the faulting instruction.
    PageFaultEntry,
}

/// Single source-of-truth cycle-cost table for fixed-cost dispatch sequences.
pub const CYCLE_COST_TABLE: &[(CycleCostKind, u16)] = &[
    (CycleCostKind::InterruptEntry, 7),
    (CycleCostKind::IllegalEntry, 7),
    (CycleCostKind::CompatNop, 2),
    (CycleCostKind::WaitIdle, 1),
    (CycleCostKind::BranchTaken, 1),
    (CycleCostKind::PageFaultEntry, 7),
];

/// Looks up the cycle cost for a cycle-cost kind.
#[must_use]
pub fn cycle_cost(kind: CycleCostKind) -> Option<u16> {
    CYCLE_COST_TABLE
        .iter()
        .find_map(|(entry_kind, cycles)| (*entry_kind == kind).then_some(*cycles))
}

/// Cycle cost as the `u32` the step loop accumulates, with a fallback for missing entries.
pub(crate) fn cycles_for(kind: CycleCostKind, fallback: u32) -> u32 {
    cycle_cost(kind).map_or(fallback, u32::from)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{cycle_cost, cycles_for, CycleCostKind, CYCLE_COST_TABLE};

    #[test]
    fn table_contains_unique_kinds() {
        let kinds: HashSet<_> = CYCLE_COST_TABLE.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds.len(), CYCLE_COST_TABLE.len());
    }

    #[test]
    fn table_values_match_canonical_costs() {
        assert_eq!(cycle_cost(CycleCostKind::InterruptEntry), Some(7));
        assert_eq!(cycle_cost(CycleCostKind::IllegalEntry), Some(7));
        assert_eq!(cycle_cost(CycleCostKind::CompatNop), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::WaitIdle), Some(1));
        assert_eq!(cycle_cost(CycleCostKind::BranchTaken), Some(1));
    }

    #[test]
    fn every_table_entry_resolves_via_lookup() {
        for (kind, expected_cycles) in CYCLE_COST_TABLE {
            assert_eq!(cycle_cost(*kind), Some(*expected_cycles));
            assert_eq!(cycles_for(*kind, 0), u32::from(*expected_cycles));
        }
    }
}
