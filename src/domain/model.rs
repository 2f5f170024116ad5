//! Wire and domain value types (spec.md §3, §4.3, §6).

use crate::domain::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic key joining service-location, specialty code, network id
/// and provider id. Stable within a request, used to correlate fan-out
/// results (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderFingerprint(String);

impl ProviderFingerprint {
    pub fn new(provider: &Provider) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            provider.service_location, provider.specialty_code, provider.network_id, provider.provider_id
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: String,
    pub network_id: String,
    pub specialty_code: String,
    pub service_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub procedure_code: String,
    pub place_of_service: String,
    pub diagnosis_code: String,
}

/// Execution mode for the orchestrator (spec.md §4.3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestMode {
    /// First provider's error propagates as the request's error.
    SingleProvider,
    /// Always returns 200 with embedded per-provider errors.
    MultiProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub membership_id: String,
    pub plan_identifier: String,
    pub benefit_product_type: String,
    pub service: ServiceDescriptor,
    pub providers: Vec<Provider>,
    pub mode: RequestMode,
    pub deadline_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitRequest {
    pub benefit_product_type: String,
    pub membership_id: String,
    pub plan_identifier: String,
    pub service: ServiceDescriptor,
    pub provider: Provider,
}

impl BenefitRequest {
    pub fn new(request: &EstimateRequest, provider: &Provider) -> Self {
        Self {
            benefit_product_type: request.benefit_product_type.clone(),
            membership_id: request.membership_id.clone(),
            plan_identifier: request.plan_identifier.clone(),
            service: request.service.clone(),
            provider: provider.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuery {
    pub service: ServiceDescriptor,
    pub provider: Provider,
}

impl RateQuery {
    pub fn new(request: &EstimateRequest, provider: &Provider) -> Self {
        Self {
            service: request.service.clone(),
            provider: provider.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulatorQuery {
    pub membership_id: String,
}

impl AccumulatorQuery {
    pub fn new(request: &EstimateRequest) -> Self {
        Self {
            membership_id: request.membership_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RateKind {
    Amount,
    Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiatedRate {
    pub amount: Money,
    pub kind: RateKind,
    pub found: bool,
}

impl NegotiatedRate {
    /// Only `kind = Amount` with `found = true` is eligible for calculation.
    pub fn is_eligible(&self) -> bool {
        self.found && self.kind == RateKind::Amount
    }
}

/// Closed set of plan rule flags that drive handler routing (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coverage {
    pub is_service_covered: bool,
    pub copay_applies_out_of_pocket: bool,
    pub coins_applies_out_of_pocket: bool,
    pub deductible_applies_out_of_pocket: bool,
    pub copay_count_to_deductible_indicator: bool,
    pub copay_continue_when_deductible_met_indicator: bool,
    pub copay_continue_when_out_of_pocket_max_met_indicator: bool,
    pub is_deductible_before_copay: bool,
    pub benefit_limitation: bool,
    /// Remaining dollar amount under a per-service benefit limitation, when
    /// `benefit_limitation` is set. Not part of the closed rule-flag set in
    /// spec.md §6 (which only names the boolean), but required to drive H2
    /// (spec.md §4.7); sourced the same way the other Coverage fields are.
    pub benefit_limit_remaining: Option<Money>,
    pub cost_share_copay: Money,
    pub cost_share_coinsurance: rust_decimal::Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub network_category: String,
    pub tier: String,
    pub code: String,
    pub coverages: Vec<Coverage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitResponse {
    pub service: String,
    pub benefits: Vec<Benefit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccumulatorLevel {
    Individual,
    Family,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccumulatorCode {
    Deductible,
    OutOfPocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccumulatorKey {
    pub code: AccumulatorCode,
    pub level: AccumulatorLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccumulatorBalance {
    pub limit: Money,
    pub consumed: Money,
    pub remaining: Money,
}

impl AccumulatorBalance {
    /// Invariant: `remaining = max(0, limit - consumed)`.
    pub fn new(limit: Money, consumed: Money) -> Self {
        Self {
            limit,
            consumed,
            remaining: limit.sub_clamped(consumed),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccumulatorResponse {
    pub balances: std::collections::HashMap<AccumulatorKeyDto, AccumulatorBalance>,
}

/// `AccumulatorKey` isn't `serde`-map-key friendly (non-string), so the wire
/// DTO stores it as a flat string and the typed key is recovered on decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccumulatorKeyDto(pub String);

impl AccumulatorResponse {
    pub fn get(&self, key: AccumulatorKey) -> Option<AccumulatorBalance> {
        self.balances.get(&AccumulatorKeyDto(dto_key(key))).copied()
    }
}

pub fn dto_key(key: AccumulatorKey) -> String {
    let code = match key.code {
        AccumulatorCode::Deductible => "Deductible",
        AccumulatorCode::OutOfPocket => "OOP",
    };
    let level = match key.level {
        AccumulatorLevel::Individual => "Individual",
        AccumulatorLevel::Family => "Family",
    };
    format!("{code}/{level}")
}

/// A Benefit already paired with the accumulator balances it references.
/// Produced by the (external) matcher, consumed by the engine.
#[derive(Debug, Clone)]
pub struct SelectedBenefit {
    pub coverage: Coverage,
    pub deductible_individual: Option<AccumulatorBalance>,
    pub deductible_family: Option<AccumulatorBalance>,
    pub oop_individual: Option<AccumulatorBalance>,
    pub oop_family: Option<AccumulatorBalance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub covered: bool,
    pub copay: Money,
    pub coinsurance_pct: rust_decimal::Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub rate: Money,
    pub kind: RateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimLine {
    pub amount_copay: Money,
    pub amount_coinsurance: Money,
    pub amount_responsibility: Money,
    pub percent_responsibility: rust_decimal::Decimal,
    pub amount_payable: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulatorSnapshot {
    pub deductible_individual: Option<AccumulatorBalance>,
    pub deductible_family: Option<AccumulatorBalance>,
    pub oop_individual: Option<AccumulatorBalance>,
    pub oop_family: Option<AccumulatorBalance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSuccess {
    pub provider: Provider,
    pub coverage: CoverageSummary,
    pub cost: CostSummary,
    pub claim_line: ClaimLine,
    pub accumulators: AccumulatorSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderErrorRecord {
    pub provider: Provider,
    pub code: crate::error::ErrorCode,
    pub message: String,
    pub query_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProviderRecord {
    Success(ProviderSuccess),
    Error(ProviderErrorRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub service: ServiceDescriptor,
    pub providers: Vec<ProviderRecord>,
}
