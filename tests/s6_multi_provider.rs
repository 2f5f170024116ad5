//! S6: multi-provider request where one provider's benefits fetch fails.
//! Asserts provider-order preservation and per-provider error isolation
//! (spec.md §8, invariants 4 and 7).

mod common;

use common::Response;
use cost_estimator::domain::matcher::DefaultMatcher;
use cost_estimator::domain::model::{
    EstimateRequest, Provider, ProviderRecord, RequestMode, ServiceDescriptor,
};
use cost_estimator::domain::orchestrator::Orchestrator;
use cost_estimator::error::ErrorCode;
use cost_estimator::infra::accumulators::HttpAccumulatorsClient;
use cost_estimator::infra::benefits::HttpBenefitsClient;
use cost_estimator::infra::http::ResilientClient;
use cost_estimator::infra::rates::HttpRatesClient;
use cost_estimator::infra::token::{CachedToken, TokenCache, TokenIssuer};
use std::collections::HashMap;
use std::sync::Arc;

struct FixedIssuer;

#[async_trait::async_trait]
impl TokenIssuer for FixedIssuer {
    async fn issue(&self) -> Result<CachedToken, cost_estimator::error::EstimateError> {
        Ok(CachedToken {
            access_token: "test-token".to_string(),
            id_token: "test-id-token".to_string(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(3600),
        })
    }
}

fn benefit_response_json() -> serde_json::Value {
    serde_json::json!({
        "service": "svc",
        "benefits": [{
            "network_category": "in",
            "tier": "standard",
            "code": "B1",
            "coverages": [{
                "is_service_covered": true,
                "copay_applies_out_of_pocket": true,
                "coins_applies_out_of_pocket": true,
                "deductible_applies_out_of_pocket": true,
                "copay_count_to_deductible_indicator": false,
                "copay_continue_when_deductible_met_indicator": false,
                "copay_continue_when_out_of_pocket_max_met_indicator": false,
                "is_deductible_before_copay": false,
                "benefit_limitation": false,
                "benefit_limit_remaining": null,
                "cost_share_copay": "20.00",
                "cost_share_coinsurance": "0"
            }]
        }]
    })
}

fn accumulator_response_json() -> serde_json::Value {
    serde_json::json!({ "balances": {} })
}

fn rate_response_json() -> serde_json::Value {
    serde_json::json!({ "amount": "150.00", "kind": "AMOUNT", "found": true })
}

fn provider(id: &str) -> Provider {
    Provider {
        provider_id: id.to_string(),
        network_id: "n1".to_string(),
        specialty_code: "sc".to_string(),
        service_location: "loc".to_string(),
    }
}

#[tokio::test]
async fn multi_provider_preserves_order_and_isolates_one_failure() {
    let mut benefit_routes = HashMap::new();
    benefit_routes.insert("benefits", Response::Json(benefit_response_json()));
    let good_benefits = common::start(benefit_routes).await;

    let mut failing_routes = HashMap::new();
    failing_routes.insert(
        "benefits",
        Response::StatusBody(400, "ACTIVE MEMBER COVERAGE NOT FOUND".to_string()),
    );
    let failing_benefits = common::start(failing_routes).await;

    let mut accumulator_routes = HashMap::new();
    accumulator_routes.insert("accumulators", Response::Json(accumulator_response_json()));
    let accumulators_server = common::start(accumulator_routes).await;

    let mut rate_routes = HashMap::new();
    rate_routes.insert("rates", Response::Json(rate_response_json()));
    let rates_server = common::start(rate_routes).await;

    let http = reqwest::Client::new();
    let tokens = Arc::new(TokenCache::new(Arc::new(FixedIssuer)));
    let metrics = cost_estimator::infra::metrics::Metrics::instance(&prometheus::Registry::new())
        .unwrap();
    let resilient = Arc::new(ResilientClient::new(http, tokens, metrics.clone()));

    // Both providers share the rates/accumulators servers but point at
    // different benefits servers: provider "good" succeeds, "bad" 500s.
    // We model this with a benefits client that dispatches per-provider.
    struct PerProviderBenefits {
        inner_good: HttpBenefitsClient,
        inner_bad: HttpBenefitsClient,
    }

    #[async_trait::async_trait]
    impl cost_estimator::domain::orchestrator::BenefitsClient for PerProviderBenefits {
        async fn fetch(
            &self,
            query: &cost_estimator::domain::model::BenefitRequest,
        ) -> Result<cost_estimator::domain::model::BenefitResponse, cost_estimator::error::EstimateError>
        {
            if query.provider.provider_id == "good" {
                self.inner_good.fetch(query).await
            } else {
                self.inner_bad.fetch(query).await
            }
        }
    }

    let benefits = Arc::new(PerProviderBenefits {
        inner_good: HttpBenefitsClient::new(resilient.clone(), good_benefits.url_for("benefits")),
        inner_bad: HttpBenefitsClient::new(resilient.clone(), failing_benefits.url_for("benefits")),
    });
    let accumulators = Arc::new(HttpAccumulatorsClient::new(
        resilient.clone(),
        accumulators_server.url_for("accumulators"),
    ));
    let rates = Arc::new(HttpRatesClient::new(resilient, rates_server.url_for("rates")));
    let matcher = Arc::new(DefaultMatcher);

    let orchestrator = Orchestrator::new(benefits, accumulators, rates, matcher, metrics);

    let request = EstimateRequest {
        membership_id: "m1".to_string(),
        plan_identifier: "p1".to_string(),
        benefit_product_type: "medical".to_string(),
        service: ServiceDescriptor {
            procedure_code: "99213".to_string(),
            place_of_service: "11".to_string(),
            diagnosis_code: "Z00".to_string(),
        },
        providers: vec![provider("good"), provider("bad")],
        mode: RequestMode::MultiProvider,
        deadline_ms: 2000,
    };

    let records = orchestrator.estimate(&request).await.unwrap();
    assert_eq!(records.len(), 2);

    // order preservation: "good" first, "bad" second, matching request.providers.
    assert!(matches!(records[0].1, ProviderRecord::Success(_)));
    match &records[1].1 {
        ProviderRecord::Error(err) => assert_eq!(err.code, ErrorCode::MemberNotFound),
        ProviderRecord::Success(_) => panic!("expected the bad provider to fail"),
    }
}
