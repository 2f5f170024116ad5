//! Concurrent fan-out orchestration (spec.md §4.8, component C8).
//!
//! For N providers the orchestrator issues 2N+1 upstream calls concurrently
//! (one benefits + one rate per provider, plus a single shared accumulator
//! lookup), then runs the handler chain once per `SelectedBenefit` surfaced
//! by the matcher, per provider, picking the entry with the highest
//! `member_pays` (earliest index wins ties).

use crate::domain::chain::{self, Wiring};
use crate::domain::context::EstimationContext;
use crate::domain::matcher::BenefitMatcher;
use crate::domain::model::{
    AccumulatorQuery, AccumulatorResponse, BenefitRequest, BenefitResponse, EstimateRequest,
    NegotiatedRate, Provider, ProviderErrorRecord, ProviderFingerprint, ProviderRecord,
    ProviderSuccess, RateQuery, RequestMode,
};
use crate::error::EstimateError;
use crate::infra::metrics::Metrics;
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait BenefitsClient: Send + Sync {
    async fn fetch(&self, query: &BenefitRequest) -> Result<BenefitResponse, EstimateError>;
}

#[async_trait]
pub trait AccumulatorsClient: Send + Sync {
    async fn fetch(&self, query: &AccumulatorQuery) -> Result<AccumulatorResponse, EstimateError>;
}

#[async_trait]
pub trait RatesClient: Send + Sync {
    async fn fetch(&self, query: &RateQuery) -> Result<NegotiatedRate, EstimateError>;
}

pub struct Orchestrator {
    benefits: Arc<dyn BenefitsClient>,
    accumulators: Arc<dyn AccumulatorsClient>,
    rates: Arc<dyn RatesClient>,
    matcher: Arc<dyn BenefitMatcher>,
    wiring: Wiring,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    pub fn new(
        benefits: Arc<dyn BenefitsClient>,
        accumulators: Arc<dyn AccumulatorsClient>,
        rates: Arc<dyn RatesClient>,
        matcher: Arc<dyn BenefitMatcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            benefits,
            accumulators,
            rates,
            matcher,
            wiring: Wiring::new(),
            metrics,
        }
    }

    /// Runs the full fan-out/fan-in for one `EstimateRequest`. The returned
    /// `Vec` preserves `request.providers` order. In `SingleProvider` mode,
    /// the first encountered provider error short-circuits the whole call;
    /// in `MultiProvider` mode every provider's outcome is embedded instead.
    pub async fn estimate(
        &self,
        request: &EstimateRequest,
    ) -> Result<Vec<(ProviderFingerprint, ProviderRecord)>, EstimateError> {
        let deadline = Duration::from_millis(request.deadline_ms);

        // One shared accumulators fetch feeds every provider's chain run
        // below without being re-issued per provider.
        let accumulators = self.accumulators.clone();
        let accumulators_query = AccumulatorQuery::new(request);
        let accumulators_fut = async move {
            flatten_timeout(tokio::time::timeout(deadline, accumulators.fetch(&accumulators_query)).await)
        }
        .boxed()
        .shared();

        // Second fan-out point (spec.md §5): the chain-resolution step runs
        // inline inside the same future as the fetch, so one provider's CPU
        // work overlaps another's still-pending I/O instead of waiting for
        // every fetch to land before any chain runs.
        let per_provider_futs = request.providers.iter().map(|provider| {
            let benefit_req = BenefitRequest::new(request, provider);
            let rate_req = RateQuery::new(request, provider);
            let accumulators_fut = accumulators_fut.clone();
            async move {
                let benefits_fut = tokio::time::timeout(deadline, self.benefits.fetch(&benefit_req));
                let rate_fut = tokio::time::timeout(deadline, self.rates.fetch(&rate_req));
                let (benefits, rate, accumulators_result) =
                    tokio::join!(benefits_fut, rate_fut, accumulators_fut);
                let result = self.resolve_provider(
                    provider,
                    flatten_timeout(benefits),
                    flatten_timeout(rate),
                    accumulators_result,
                );
                (ProviderFingerprint::new(provider), provider.clone(), result)
            }
        });

        let per_provider_results = join_all(per_provider_futs).await;

        let mut out = Vec::with_capacity(request.providers.len());
        for (fingerprint, provider, result) in per_provider_results {
            match (request.mode, result) {
                (RequestMode::SingleProvider, Err(err)) => {
                    self.metrics.record_provider_outcome(&err.code().to_string());
                    return Err(err);
                }
                (_, Ok(success)) => {
                    self.metrics.record_provider_outcome("success");
                    out.push((fingerprint, ProviderRecord::Success(success)));
                }
                (_, Err(err)) => {
                    self.metrics.record_provider_outcome(&err.code().to_string());
                    out.push((
                        fingerprint,
                        ProviderRecord::Error(ProviderErrorRecord {
                            provider: provider.clone(),
                            code: err.code(),
                            message: err.to_string(),
                            query_summary: err.query_summary(),
                        }),
                    ));
                }
            }
        }
        Ok(out)
    }

    fn resolve_provider(
        &self,
        provider: &Provider,
        benefits_result: Result<BenefitResponse, EstimateError>,
        rate_result: Result<NegotiatedRate, EstimateError>,
        accumulators_result: Result<AccumulatorResponse, EstimateError>,
    ) -> Result<ProviderSuccess, EstimateError> {
        let fingerprint = ProviderFingerprint::new(provider);
        let _span = tracing::info_span!("resolve_provider", %fingerprint).entered();

        let benefits = benefits_result?;
        let rate = rate_result?;
        let accumulators = accumulators_result?;

        if !rate.is_eligible() {
            return Err(EstimateError::RateNotFound {
                query_summary: provider_summary(provider),
            });
        }

        let candidates = self.matcher.select(&benefits, &accumulators)?;
        let contexts = candidates.iter().map(|selected| {
            let mut ctx = EstimationContext::from_selected_benefit(selected, rate.amount);
            chain::run_chain(&self.wiring, &mut ctx);
            self.metrics.observe_chain_hops(ctx.trace.len());
            for handler in &ctx.trace {
                self.metrics.record_handler_visit(&handler.to_string());
            }
            ctx
        });
        // Earliest index wins ties, so fold rather than `max_by` (which
        // returns the *last* maximal element).
        let winner = contexts
            .into_iter()
            .fold(None, |best: Option<EstimationContext>, ctx| match best {
                Some(current) if current.member_pays >= ctx.member_pays => Some(current),
                _ => Some(ctx),
            })
            .ok_or_else(|| EstimateError::BenefitsNotFound {
                message: "matcher returned no candidate coverage".to_string(),
                query_summary: provider_summary(provider),
            })?;

        Ok(crate::domain::assembler::build_provider_success(
            provider, &rate, &winner,
        ))
    }
}

fn flatten_timeout<T>(
    result: Result<Result<T, EstimateError>, tokio::time::error::Elapsed>,
) -> Result<T, EstimateError> {
    match result {
        Ok(inner) => inner,
        Err(_) => Err(EstimateError::UpstreamTimeout {
            query_summary: String::new(),
        }),
    }
}

fn provider_summary(provider: &Provider) -> String {
    format!(
        "{}|{}|{}|{}",
        provider.service_location, provider.specialty_code, provider.network_id, provider.provider_id
    )
}
