//! Typed seam to the benefit-matching collaborator. Selecting the applicable
//! coverage row (network/tier/benefit code matching) is explicitly out of
//! scope (spec.md §1 Non-goals); this trait is the boundary the engine calls
//! across, so orchestration code has something concrete to hold.

use crate::domain::model::{AccumulatorResponse, BenefitResponse, SelectedBenefit};
use crate::error::EstimateError;

/// Picks the applicable `Coverage` rows out of a benefit response and joins
/// them with the caller's accumulator balances. A single `BenefitResponse`
/// may yield more than one `SelectedBenefit` (e.g. in/out-of-network splits);
/// the orchestrator runs the chain once per entry and keeps the worst-case
/// member responsibility.
pub trait BenefitMatcher: Send + Sync {
    fn select(
        &self,
        benefits: &BenefitResponse,
        accumulators: &AccumulatorResponse,
    ) -> Result<Vec<SelectedBenefit>, EstimateError>;
}

/// Flattens every coverage row across every benefit in the response into a
/// `SelectedBenefit`, joining each against the individual/family deductible
/// and OOPMax balances. Network/tier/benefit-code selection is out of scope
/// (spec.md §1 Non-goals); this is the simplest matcher that still lets the
/// chain run end to end, and a stand-in for a real selection service.
pub struct DefaultMatcher;

impl BenefitMatcher for DefaultMatcher {
    fn select(
        &self,
        benefits: &BenefitResponse,
        accumulators: &AccumulatorResponse,
    ) -> Result<Vec<SelectedBenefit>, EstimateError> {
        use crate::domain::model::{AccumulatorCode, AccumulatorKey, AccumulatorLevel};

        let deductible_individual = accumulators.get(AccumulatorKey {
            code: AccumulatorCode::Deductible,
            level: AccumulatorLevel::Individual,
        });
        let deductible_family = accumulators.get(AccumulatorKey {
            code: AccumulatorCode::Deductible,
            level: AccumulatorLevel::Family,
        });
        let oop_individual = accumulators.get(AccumulatorKey {
            code: AccumulatorCode::OutOfPocket,
            level: AccumulatorLevel::Individual,
        });
        let oop_family = accumulators.get(AccumulatorKey {
            code: AccumulatorCode::OutOfPocket,
            level: AccumulatorLevel::Family,
        });

        let selected = benefits
            .benefits
            .iter()
            .flat_map(|benefit| benefit.coverages.iter())
            .map(|coverage| SelectedBenefit {
                coverage: coverage.clone(),
                deductible_individual,
                deductible_family,
                oop_individual,
                oop_family,
            })
            .collect();
        Ok(selected)
    }
}
