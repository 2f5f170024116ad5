//! Handler chain driver (spec.md §4.7, component C7).

mod handlers;
mod wiring;

pub use handlers::Next;
pub use wiring::Wiring;

use crate::domain::context::{EstimationContext, HandlerId};

/// Runs the chain starting at `HandlerId::ENTRY` until a handler completes
/// the context or the bounded visit count is exhausted. The bound equals the
/// handler count: every handler appears on at most one path from H1 to a
/// sink in the wired graph, so a well-formed chain can never need more hops.
pub fn run_chain(wiring: &Wiring, ctx: &mut EstimationContext) {
    let mut current = HandlerId::ENTRY;
    for _ in 0..HandlerId::COUNT {
        let handler = wiring.dispatch(current);
        match handler(ctx) {
            Next::Complete => return,
            Next::GoTo(next) => current = next,
        }
    }
    panic!("handler chain exceeded {} hops without completing (cycle?)", HandlerId::COUNT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AccumulatorBalance, Coverage, SelectedBenefit};
    use crate::domain::money::Money;
    use rust_decimal::Decimal;

    fn base_coverage() -> Coverage {
        Coverage {
            is_service_covered: true,
            copay_applies_out_of_pocket: true,
            coins_applies_out_of_pocket: true,
            deductible_applies_out_of_pocket: true,
            copay_count_to_deductible_indicator: false,
            copay_continue_when_deductible_met_indicator: false,
            copay_continue_when_out_of_pocket_max_met_indicator: false,
            is_deductible_before_copay: false,
            benefit_limitation: false,
            benefit_limit_remaining: None,
            cost_share_copay: Money::ZERO,
            cost_share_coinsurance: Decimal::ZERO,
        }
    }

    fn selected(coverage: Coverage) -> SelectedBenefit {
        SelectedBenefit {
            coverage,
            deductible_individual: None,
            deductible_family: None,
            oop_individual: None,
            oop_family: None,
        }
    }

    #[test]
    fn not_covered_routes_to_full_member_responsibility() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.is_service_covered = false;
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected(coverage),
            Money::from_i64(100),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.member_pays, Money::from_i64(100));
        assert_eq!(ctx.amount_other, Money::from_i64(100));
        assert_eq!(ctx.trace, vec![HandlerId::H1ServiceCoverage]);
    }

    #[test]
    fn benefit_limit_exhausted_routes_to_full_member_responsibility() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.benefit_limitation = true;
        coverage.benefit_limit_remaining = Some(Money::ZERO);
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected(coverage),
            Money::from_i64(50),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.member_pays, Money::from_i64(50));
        assert_eq!(ctx.amount_other, Money::from_i64(50));
    }

    #[test]
    fn oop_already_met_with_no_continuing_copay_completes_with_zero_member_pays() {
        let wiring = Wiring::new();
        let coverage = base_coverage();
        let mut selected_benefit = selected(coverage);
        selected_benefit.oop_individual = Some(AccumulatorBalance::new(Money::from_i64(100), Money::from_i64(100)));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(50),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.member_pays, Money::ZERO);
        assert_eq!(
            ctx.trace,
            vec![HandlerId::H1ServiceCoverage, HandlerId::H2BenefitLimitation, HandlerId::H3OopMax]
        );
    }

    #[test]
    fn coinsurance_only_flows_through_deductible_then_sink() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_coinsurance = Decimal::from(20);
        let mut selected_benefit = selected(coverage);
        selected_benefit.deductible_individual =
            Some(AccumulatorBalance::new(Money::from_i64(0), Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(100),
        );
        run_chain(&wiring, &mut ctx);
        // no deductible due, no copay: falls straight through H6 to H10.
        assert_eq!(ctx.amount_coinsurance, Money::from_i64(20));
        assert_eq!(ctx.member_pays, Money::from_i64(20));
    }

    #[test]
    fn member_pays_equals_sum_of_buckets_when_covered() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(10);
        coverage.cost_share_coinsurance = Decimal::from(10);
        let selected_benefit = selected(coverage);
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(200),
        );
        run_chain(&wiring, &mut ctx);
        let sum = ctx.amount_copay + ctx.amount_coinsurance + ctx.amount_deductible + ctx.amount_other;
        assert_eq!(ctx.member_pays, sum);
    }

    #[test]
    fn copay_continues_false_after_oop_met_pays_nothing() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(25);
        let mut selected_benefit = selected(coverage);
        selected_benefit.oop_individual = Some(AccumulatorBalance::new(Money::ZERO, Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.member_pays, Money::ZERO);
    }

    #[test]
    fn copay_continues_true_after_oop_met_pays_copay_via_h4() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(25);
        coverage.copay_continue_when_out_of_pocket_max_met_indicator = true;
        let mut selected_benefit = selected(coverage);
        selected_benefit.oop_individual = Some(AccumulatorBalance::new(Money::ZERO, Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.member_pays, Money::from_i64(25));
        assert_eq!(ctx.amount_copay, Money::from_i64(25));
        assert_eq!(ctx.trace.last(), Some(&HandlerId::H4OopMaxCopay));
    }

    #[test]
    fn pure_copay_not_counted_to_deductible_bypasses_it() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(25);
        let mut selected_benefit = selected(coverage);
        selected_benefit.deductible_individual =
            Some(AccumulatorBalance::new(Money::from_i64(600), Money::ZERO));
        selected_benefit.oop_individual =
            Some(AccumulatorBalance::new(Money::from_i64(3000), Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        // copay doesn't count toward the deductible here, so it's untouched
        // and the member's whole responsibility is the $25 copay.
        assert_eq!(ctx.member_pays, Money::from_i64(25));
        assert_eq!(ctx.amount_copay, Money::from_i64(25));
        assert_eq!(ctx.amount_coinsurance, Money::ZERO);
        assert_eq!(ctx.service_amount, Money::from_i64(975));
        assert_eq!(
            ctx.trace,
            vec![
                HandlerId::H1ServiceCoverage,
                HandlerId::H2BenefitLimitation,
                HandlerId::H3OopMax,
                HandlerId::H5Deductible,
                HandlerId::H6CostShareCopay,
            ]
        );
    }

    #[test]
    fn coinsurance_only_applies_deductible_before_coinsurance() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_coinsurance = Decimal::from(20);
        let mut selected_benefit = selected(coverage);
        selected_benefit.deductible_individual =
            Some(AccumulatorBalance::new(Money::from_i64(600), Money::ZERO));
        selected_benefit.oop_individual =
            Some(AccumulatorBalance::new(Money::from_i64(3000), Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.amount_deductible, Money::from_i64(600));
        assert_eq!(ctx.amount_coinsurance, Money::from_i64(80));
        assert_eq!(ctx.member_pays, Money::from_i64(680));
    }

    #[test]
    fn deductible_before_copay_routes_through_h9() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(25);
        coverage.is_deductible_before_copay = true;
        let mut selected_benefit = selected(coverage);
        selected_benefit.deductible_individual =
            Some(AccumulatorBalance::new(Money::from_i64(600), Money::ZERO));
        selected_benefit.oop_individual =
            Some(AccumulatorBalance::new(Money::from_i64(3000), Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.amount_deductible, Money::from_i64(600));
        assert_eq!(ctx.amount_copay, Money::from_i64(25));
        assert_eq!(ctx.member_pays, Money::from_i64(625));
        assert_eq!(
            ctx.trace,
            vec![
                HandlerId::H1ServiceCoverage,
                HandlerId::H2BenefitLimitation,
                HandlerId::H3OopMax,
                HandlerId::H5Deductible,
                HandlerId::H9DeductibleCopay,
            ]
        );
    }

    #[test]
    fn deductible_exhausting_oop_from_h9_routes_to_h8() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(25);
        coverage.is_deductible_before_copay = true;
        let mut selected_benefit = selected(coverage);
        selected_benefit.deductible_individual =
            Some(AccumulatorBalance::new(Money::from_i64(600), Money::ZERO));
        selected_benefit.oop_individual =
            Some(AccumulatorBalance::new(Money::from_i64(300), Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        // OOPMax would be exhausted partway through the deductible, so H9
        // hands off to H8 instead of applying the deductible itself.
        assert_eq!(ctx.amount_deductible, Money::from_i64(300));
        assert_eq!(ctx.amount_copay, Money::ZERO);
        assert_eq!(ctx.member_pays, Money::from_i64(300));
        assert_eq!(
            ctx.trace,
            vec![
                HandlerId::H1ServiceCoverage,
                HandlerId::H2BenefitLimitation,
                HandlerId::H3OopMax,
                HandlerId::H5Deductible,
                HandlerId::H9DeductibleCopay,
                HandlerId::H8DeductibleOopMax,
            ]
        );
    }

    #[test]
    fn copay_and_coinsurance_together_route_through_h7_into_h10() {
        let wiring = Wiring::new();
        let mut coverage = base_coverage();
        coverage.cost_share_copay = Money::from_i64(25);
        coverage.cost_share_coinsurance = Decimal::from(20);
        let mut selected_benefit = selected(coverage);
        selected_benefit.deductible_individual =
            Some(AccumulatorBalance::new(Money::from_i64(600), Money::ZERO));
        selected_benefit.oop_individual =
            Some(AccumulatorBalance::new(Money::from_i64(3000), Money::ZERO));
        let mut ctx = EstimationContext::from_selected_benefit(
            &selected_benefit,
            Money::from_i64(1000),
        );
        run_chain(&wiring, &mut ctx);
        assert_eq!(ctx.amount_deductible, Money::from_i64(600));
        assert_eq!(ctx.amount_copay, Money::from_i64(25));
        assert_eq!(ctx.amount_coinsurance, Money::from_i64(75));
        assert_eq!(ctx.member_pays, Money::from_i64(700));
        assert_eq!(
            ctx.trace,
            vec![
                HandlerId::H1ServiceCoverage,
                HandlerId::H2BenefitLimitation,
                HandlerId::H3OopMax,
                HandlerId::H5Deductible,
                HandlerId::H7DeductibleCostShareCopay,
                HandlerId::H10DeductibleCoInsurance,
            ]
        );
    }
}
