//! Pure response assembly (spec.md §4.9, component C9). Takes the
//! orchestrator's per-provider records and the finished handler-chain
//! context for the winning coverage and builds the wire types, preserving
//! the caller's provider order.

use crate::domain::context::EstimationContext;
use crate::domain::model::{
    ClaimLine, CostSummary, CoverageSummary, EstimateRequest, EstimateResponse, NegotiatedRate,
    Provider, ProviderFingerprint, ProviderRecord, ProviderSuccess,
};
use rust_decimal::Decimal;

pub fn build_provider_success(
    provider: &Provider,
    rate: &NegotiatedRate,
    ctx: &EstimationContext,
) -> ProviderSuccess {
    let amount_responsibility = ctx.member_pays;
    let percent_responsibility = if rate.amount.is_zero() {
        Decimal::ZERO
    } else {
        (amount_responsibility.as_decimal() / rate.amount.as_decimal()) * Decimal::ONE_HUNDRED
    };
    let amount_payable = rate.amount.sub_clamped(amount_responsibility);

    ProviderSuccess {
        provider: provider.clone(),
        coverage: CoverageSummary {
            covered: ctx.is_service_covered,
            copay: ctx.copay,
            coinsurance_pct: ctx.coinsurance_pct,
        },
        cost: CostSummary {
            rate: rate.amount,
            kind: rate.kind,
        },
        claim_line: ClaimLine {
            amount_copay: ctx.amount_copay,
            amount_coinsurance: ctx.amount_coinsurance,
            amount_responsibility,
            percent_responsibility,
            amount_payable,
        },
        accumulators: ctx.accumulator_snapshot(),
    }
}

/// Assembles the final response from the orchestrator's fingerprint-indexed
/// records, re-ordered to match `request.providers`.
pub fn assemble(
    request: &EstimateRequest,
    mut records: std::collections::HashMap<ProviderFingerprint, ProviderRecord>,
) -> EstimateResponse {
    let providers = request
        .providers
        .iter()
        .filter_map(|provider| {
            let fingerprint = ProviderFingerprint::new(provider);
            records.remove(&fingerprint)
        })
        .collect();

    EstimateResponse {
        service: request.service.clone(),
        providers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Coverage, RateKind, SelectedBenefit};
    use crate::domain::money::Money;

    #[test]
    fn percent_responsibility_is_relative_to_negotiated_rate() {
        let coverage = Coverage {
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
            cost_share_copay: Money::from_i64(25),
            cost_share_coinsurance: Decimal::ZERO,
        };
        let selected = SelectedBenefit {
            coverage,
            deductible_individual: None,
            deductible_family: None,
            oop_individual: None,
            oop_family: None,
        };
        let mut ctx = EstimationContext::from_selected_benefit(&selected, Money::from_i64(100));
        ctx.member_pays = Money::from_i64(25);
        ctx.amount_copay = Money::from_i64(25);

        let provider = Provider {
            provider_id: "p1".into(),
            network_id: "n1".into(),
            specialty_code: "sc".into(),
            service_location: "loc".into(),
        };
        let rate = NegotiatedRate {
            amount: Money::from_i64(100),
            kind: RateKind::Amount,
            found: true,
        };
        let success = build_provider_success(&provider, &rate, &ctx);
        assert_eq!(success.claim_line.percent_responsibility, Decimal::from(25));
        assert_eq!(success.claim_line.amount_payable, Money::from_i64(75));
    }
}
