//! The ten handlers (spec.md §4.7, H1–H10). Each handler either completes the
//! context or names exactly one outbound edge; `wiring.rs` owns the edge
//! table and start-up validation.

use crate::domain::context::{EstimationContext, HandlerId, PaymentBucket};
use crate::domain::money::{gt_zero, le_zero};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Complete,
    GoTo(HandlerId),
}

fn complete(ctx: &mut EstimationContext) -> Next {
    ctx.calculation_complete = true;
    Next::Complete
}

/// H1 ServiceCoverage.
pub fn h1_service_coverage(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H1ServiceCoverage);
    if !ctx.is_service_covered {
        ctx.apply_payment(ctx.service_amount, PaymentBucket::Other);
        return complete(ctx);
    }
    Next::GoTo(HandlerId::H2BenefitLimitation)
}

/// H2 BenefitLimitation.
pub fn h2_benefit_limitation(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H2BenefitLimitation);
    if ctx.has_benefit_limit && !ctx.limit_remaining.is_positive() {
        ctx.apply_payment(ctx.service_amount, PaymentBucket::Other);
        return complete(ctx);
    }
    Next::GoTo(HandlerId::H3OopMax)
}

/// H3 OOPMax.
pub fn h3_oop_max(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H3OopMax);
    let min_oop = ctx.min_oop_remaining();
    if le_zero(min_oop) {
        if ctx.copay_continues_when_oop_met {
            return Next::GoTo(HandlerId::H4OopMaxCopay);
        }
        return complete(ctx);
    }
    Next::GoTo(HandlerId::H5Deductible)
}

/// H4 OOPMaxCopay.
pub fn h4_oop_max_copay(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H4OopMaxCopay);
    let p = ctx.copay.min(ctx.service_amount);
    ctx.apply_payment(p, PaymentBucket::Copay);
    complete(ctx)
}

/// H5 Deductible.
pub fn h5_deductible(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H5Deductible);
    let d = ctx.min_deductible_remaining();
    let has_deductible_due = gt_zero(d);

    if !has_deductible_due {
        return Next::GoTo(HandlerId::H6CostShareCopay);
    }

    if ctx.is_deductible_before_copay {
        return Next::GoTo(HandlerId::H9DeductibleCopay);
    }

    let has_copay = ctx.copay.is_positive();
    let has_coinsurance = ctx.coinsurance_pct > Decimal::ZERO;

    if has_copay && has_coinsurance {
        return Next::GoTo(HandlerId::H7DeductibleCostShareCopay);
    }

    if has_copay && !has_coinsurance && !ctx.copay_counts_to_deductible {
        // A flat copay that doesn't count toward the deductible bypasses it
        // entirely; the member's only responsibility is the copay at H6.
        return Next::GoTo(HandlerId::H6CostShareCopay);
    }

    // Only coinsurance, or a copay that counts toward the deductible: apply
    // deductible directly, then decide whether cost-share continues on any
    // remainder.
    let d = d.expect("has_deductible_due implies Some");
    let amount = d.min(ctx.service_amount);
    ctx.apply_deductible_only(amount);

    let coinsurance_still_due = has_coinsurance && ctx.service_amount.is_positive();
    if ctx.copay_continues_when_deductible_met || coinsurance_still_due {
        Next::GoTo(HandlerId::H6CostShareCopay)
    } else {
        complete(ctx)
    }
}

/// H6 CostShareCoPay: applies copay capped by both the remaining service
/// amount and the remaining OOPMax, then routes onward depending on whether
/// OOPMax or the service amount was exhausted.
pub fn h6_cost_share_copay(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H6CostShareCopay);
    let mut amount = ctx.copay.min(ctx.service_amount);
    if let Some(cap) = ctx.min_oop_remaining() {
        amount = amount.min(cap);
    }
    ctx.apply_payment(amount, PaymentBucket::Copay);

    if le_zero(ctx.min_oop_remaining()) {
        return oop_met_next(ctx);
    }
    if !ctx.service_amount.is_positive() {
        return complete(ctx);
    }
    if ctx.coinsurance_pct > Decimal::ZERO {
        Next::GoTo(HandlerId::H10DeductibleCoInsurance)
    } else {
        complete(ctx)
    }
}

fn oop_met_next(ctx: &mut EstimationContext) -> Next {
    if ctx.copay_continues_when_oop_met {
        Next::GoTo(HandlerId::H4OopMaxCopay)
    } else {
        complete(ctx)
    }
}

/// Shared OOP-exhaustion-by-deductible check used by H7 and H9: if applying
/// the full deductible due would itself consume the remaining OOPMax,
/// control passes to H8 instead.
fn deductible_would_exhaust_oop(ctx: &EstimationContext) -> bool {
    match (ctx.min_deductible_remaining(), ctx.min_oop_remaining()) {
        (Some(d), Some(oop)) => oop < d,
        _ => false,
    }
}

/// H7 DeductibleCostShareCoPay.
pub fn h7_deductible_cost_share_copay(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H7DeductibleCostShareCopay);

    if deductible_would_exhaust_oop(ctx) {
        return Next::GoTo(HandlerId::H8DeductibleOopMax);
    }

    let d = ctx.min_deductible_remaining().unwrap_or(ctx.service_amount);
    let amount_d = d.min(ctx.service_amount);
    ctx.deductible_individual_remaining =
        crate::domain::money::decrement_optional(ctx.deductible_individual_remaining, amount_d);
    ctx.deductible_family_remaining =
        crate::domain::money::decrement_optional(ctx.deductible_family_remaining, amount_d);
    ctx.apply_payment(amount_d, PaymentBucket::Deductible);

    if !ctx.service_amount.is_positive() {
        return complete(ctx);
    }

    let oop_cap = ctx.min_oop_remaining();
    let p = ctx.copay.min(ctx.service_amount);
    let p = match oop_cap {
        Some(cap) => p.min(cap),
        None => p,
    };
    ctx.apply_payment(p, PaymentBucket::Copay);

    if !ctx.service_amount.is_positive() || le_zero(ctx.min_oop_remaining()) {
        return complete(ctx);
    }

    Next::GoTo(HandlerId::H10DeductibleCoInsurance)
}

/// H8 DeductibleOOPMax.
pub fn h8_deductible_oop_max(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H8DeductibleOopMax);
    let d = ctx.min_deductible_remaining().unwrap_or(ctx.service_amount);
    let oop = ctx.min_oop_remaining().unwrap_or(ctx.service_amount);
    let amount = d.min(oop).min(ctx.service_amount);

    ctx.deductible_individual_remaining =
        crate::domain::money::decrement_optional(ctx.deductible_individual_remaining, amount);
    ctx.deductible_family_remaining =
        crate::domain::money::decrement_optional(ctx.deductible_family_remaining, amount);
    ctx.apply_payment(amount, PaymentBucket::Deductible);
    complete(ctx)
}

/// H9 DeductibleCoPay.
pub fn h9_deductible_copay(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H9DeductibleCopay);

    if deductible_would_exhaust_oop(ctx) {
        return Next::GoTo(HandlerId::H8DeductibleOopMax);
    }

    let d = ctx.min_deductible_remaining().unwrap_or(ctx.service_amount);
    let amount_d = d.min(ctx.service_amount);
    ctx.deductible_individual_remaining =
        crate::domain::money::decrement_optional(ctx.deductible_individual_remaining, amount_d);
    ctx.deductible_family_remaining =
        crate::domain::money::decrement_optional(ctx.deductible_family_remaining, amount_d);
    ctx.apply_payment(amount_d, PaymentBucket::Deductible);

    if !ctx.service_amount.is_positive() {
        return complete(ctx);
    }

    let oop_cap = ctx.min_oop_remaining();
    let p = ctx.copay.min(ctx.service_amount);
    let p = match oop_cap {
        Some(cap) => p.min(cap),
        None => p,
    };
    ctx.apply_payment(p, PaymentBucket::Copay);

    if !ctx.service_amount.is_positive() || le_zero(ctx.min_oop_remaining()) {
        return complete(ctx);
    }

    if ctx.coinsurance_pct > Decimal::ZERO {
        Next::GoTo(HandlerId::H10DeductibleCoInsurance)
    } else {
        complete(ctx)
    }
}

/// H10 DeductibleCoInsurance (sink).
pub fn h10_deductible_coinsurance(ctx: &mut EstimationContext) -> Next {
    ctx.visit(HandlerId::H10DeductibleCoInsurance);
    let raw = ctx.service_amount.percent_of(ctx.coinsurance_pct);
    let mut amount = raw.min(ctx.service_amount);
    if let Some(cap) = ctx.min_oop_remaining() {
        amount = amount.min(cap);
    }
    ctx.apply_payment(amount, PaymentBucket::Coinsurance);
    complete(ctx)
}
