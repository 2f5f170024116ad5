//! The mutable scratchpad that flows through the handler chain (spec.md §3,
//! §4.6 — component C6).

use crate::domain::model::SelectedBenefit;
use crate::domain::money::Money;
use rust_decimal::Decimal;

/// Identifies a handler in the chain (spec.md §4.7, §9 — closed tagged
/// enumeration used for wiring and tracing).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum HandlerId {
    H1ServiceCoverage,
    H2BenefitLimitation,
    H3OopMax,
    H4OopMaxCopay,
    H5Deductible,
    H6CostShareCopay,
    H7DeductibleCostShareCopay,
    H8DeductibleOopMax,
    H9DeductibleCopay,
    H10DeductibleCoInsurance,
}

impl HandlerId {
    pub const COUNT: usize = 10;
    pub const ENTRY: HandlerId = HandlerId::H1ServiceCoverage;
}

#[derive(Debug, Clone)]
pub struct EstimationContext {
    pub service_amount: Money,

    pub is_service_covered: bool,

    pub has_benefit_limit: bool,
    pub limit_remaining: Money,

    pub copay: Money,
    pub coinsurance_pct: Decimal,

    pub deductible_individual_remaining: Option<Money>,
    pub deductible_family_remaining: Option<Money>,
    pub oop_individual_remaining: Option<Money>,
    pub oop_family_remaining: Option<Money>,

    /// Limits as of `populateFromBenefit`, kept alongside the `_remaining`
    /// fields the chain mutates so the response assembler can report each
    /// accumulator's post-calculation balance (spec.md §4.9 accumulator
    /// snapshot) without the chain itself tracking `consumed`.
    pub deductible_individual_limit: Option<Money>,
    pub deductible_family_limit: Option<Money>,
    pub oop_individual_limit: Option<Money>,
    pub oop_family_limit: Option<Money>,

    pub is_deductible_before_copay: bool,
    pub copay_counts_to_deductible: bool,
    pub copay_continues_when_deductible_met: bool,
    pub copay_continues_when_oop_met: bool,

    pub member_pays: Money,
    pub amount_copay: Money,
    pub amount_coinsurance: Money,
    /// Portion of `member_pays` attributed to deductible consumption,
    /// distinct from copay/coinsurance (spec.md §3 invariant: `member_pays =
    /// amount_copay + amount_coinsurance + deductible_paid_in_this_context`).
    pub amount_deductible: Money,
    /// Portion of `member_pays` attributed to full-responsibility
    /// short-circuits (not covered, benefit limit exhausted, OOP-met with no
    /// continuing copay). See DESIGN.md for why this fourth bucket exists.
    pub amount_other: Money,

    pub calculation_complete: bool,
    pub trace: Vec<HandlerId>,
}

impl EstimationContext {
    /// `populateFromBenefit` (spec.md §4.6).
    pub fn from_selected_benefit(selected: &SelectedBenefit, service_amount: Money) -> Self {
        let coverage = &selected.coverage;
        Self {
            service_amount,
            is_service_covered: coverage.is_service_covered,
            has_benefit_limit: coverage.benefit_limitation,
            limit_remaining: coverage.benefit_limit_remaining.unwrap_or(Money::ZERO),
            copay: coverage.cost_share_copay,
            coinsurance_pct: coverage.cost_share_coinsurance,
            deductible_individual_remaining: selected.deductible_individual.map(|b| b.remaining),
            deductible_family_remaining: selected.deductible_family.map(|b| b.remaining),
            oop_individual_remaining: selected.oop_individual.map(|b| b.remaining),
            oop_family_remaining: selected.oop_family.map(|b| b.remaining),
            deductible_individual_limit: selected.deductible_individual.map(|b| b.limit),
            deductible_family_limit: selected.deductible_family.map(|b| b.limit),
            oop_individual_limit: selected.oop_individual.map(|b| b.limit),
            oop_family_limit: selected.oop_family.map(|b| b.limit),
            is_deductible_before_copay: coverage.is_deductible_before_copay,
            copay_counts_to_deductible: coverage.copay_count_to_deductible_indicator,
            copay_continues_when_deductible_met: coverage
                .copay_continue_when_deductible_met_indicator,
            copay_continues_when_oop_met: coverage
                .copay_continue_when_out_of_pocket_max_met_indicator,
            member_pays: Money::ZERO,
            amount_copay: Money::ZERO,
            amount_coinsurance: Money::ZERO,
            amount_deductible: Money::ZERO,
            amount_other: Money::ZERO,
            calculation_complete: false,
            trace: Vec::with_capacity(HandlerId::COUNT),
        }
    }

    pub fn visit(&mut self, handler: HandlerId) {
        tracing::debug!(%handler, "chain hop");
        self.trace.push(handler);
    }

    /// Applies a payment that counts toward both OOP maximums, clamped so it
    /// never exceeds `service_amount`. Used by every "pay-apply" handler
    /// (H4, H6, H7, H8, H9, H10).
    pub fn apply_payment(&mut self, amount: Money, bucket: PaymentBucket) {
        let amount = amount.min(self.service_amount);
        self.member_pays += amount;
        match bucket {
            PaymentBucket::Copay => self.amount_copay += amount,
            PaymentBucket::Coinsurance => self.amount_coinsurance += amount,
            PaymentBucket::Deductible => self.amount_deductible += amount,
            PaymentBucket::Other => self.amount_other += amount,
        }
        self.service_amount = self.service_amount.sub_clamped(amount);
        self.oop_individual_remaining =
            crate::domain::money::decrement_optional(self.oop_individual_remaining, amount);
        self.oop_family_remaining =
            crate::domain::money::decrement_optional(self.oop_family_remaining, amount);
    }

    /// Applies a deductible payment that does *not* count toward OOP (H5's
    /// plain single-cost-share-type branch; see DESIGN.md).
    pub fn apply_deductible_only(&mut self, amount: Money) {
        let amount = amount.min(self.service_amount);
        self.member_pays += amount;
        self.amount_deductible += amount;
        self.service_amount = self.service_amount.sub_clamped(amount);
        self.deductible_individual_remaining = crate::domain::money::decrement_optional(
            self.deductible_individual_remaining,
            amount,
        );
        self.deductible_family_remaining =
            crate::domain::money::decrement_optional(self.deductible_family_remaining, amount);
    }

    pub fn min_oop_remaining(&self) -> Option<Money> {
        crate::domain::money::min_defined(
            self.oop_individual_remaining,
            self.oop_family_remaining,
        )
    }

    pub fn min_deductible_remaining(&self) -> Option<Money> {
        crate::domain::money::min_defined(
            self.deductible_individual_remaining,
            self.deductible_family_remaining,
        )
    }

    /// Reconstructs the four post-calculation accumulator balances for the
    /// response snapshot. `None` when the corresponding balance wasn't
    /// present on the selected benefit to begin with.
    pub fn accumulator_snapshot(&self) -> crate::domain::model::AccumulatorSnapshot {
        use crate::domain::model::AccumulatorBalance;
        let rebuild = |limit: Option<Money>, remaining: Option<Money>| {
            let (limit, remaining) = (limit?, remaining?);
            Some(AccumulatorBalance {
                limit,
                consumed: limit.sub_clamped(remaining),
                remaining,
            })
        };
        crate::domain::model::AccumulatorSnapshot {
            deductible_individual: rebuild(
                self.deductible_individual_limit,
                self.deductible_individual_remaining,
            ),
            deductible_family: rebuild(self.deductible_family_limit, self.deductible_family_remaining),
            oop_individual: rebuild(self.oop_individual_limit, self.oop_individual_remaining),
            oop_family: rebuild(self.oop_family_limit, self.oop_family_remaining),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBucket {
    Copay,
    Coinsurance,
    Deductible,
    Other,
}
