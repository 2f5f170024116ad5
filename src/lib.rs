pub mod arguments;
pub mod domain;
pub mod error;
pub mod infra;
pub mod telemetry;

use crate::arguments::Arguments;
use crate::domain::orchestrator::Orchestrator;
use crate::infra::accumulators::HttpAccumulatorsClient;
use crate::infra::benefits::HttpBenefitsClient;
use crate::infra::metrics::{LivenessChecking, Metrics};
use crate::infra::rates::HttpRatesClient;
use crate::infra::token::TokenCache;
use std::sync::Arc;

struct Liveness;

#[async_trait::async_trait]
impl LivenessChecking for Liveness {
    async fn is_alive(&self) -> bool {
        true
    }
}

/// Assumes tracing has already been initialized by the caller.
pub async fn start(args: Arguments, matcher: Arc<dyn crate::domain::matcher::BenefitMatcher>) {
    let metrics = Metrics::instance(global_metrics_registry())
        .expect("metrics registration must succeed at start-up");

    let http = reqwest::Client::builder()
        .danger_accept_invalid_certs(!args.tls_verify)
        .build()
        .expect("reqwest client configuration is static and always valid");

    let token_issuer = Arc::new(crate::infra::token_issuer::HttpTokenIssuer::new(
        http.clone(),
        args.token_url.clone(),
    ));
    let tokens = Arc::new(TokenCache::new(token_issuer));
    let resilient = Arc::new(crate::infra::http::ResilientClient::with_config(
        http,
        tokens,
        crate::infra::http::CircuitBreakerConfig {
            failure_threshold: args.circuit_threshold,
            open_duration: args.circuit_cooldown(),
        },
        crate::infra::http::RetryConfig {
            max_attempts: args.http_retry_max_attempts,
            backoff_min: args.backoff_min(),
            backoff_max: args.backoff_max(),
        },
        metrics.clone(),
    ));

    let benefits = Arc::new(HttpBenefitsClient::new(resilient.clone(), args.benefits_url.clone()));
    let accumulators = Arc::new(HttpAccumulatorsClient::new(
        resilient.clone(),
        args.accumulators_url.clone(),
    ));
    let rates = Arc::new(HttpRatesClient::new(resilient, args.rates_url.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        benefits,
        accumulators,
        rates,
        matcher,
        metrics.clone(),
    ));

    let api = crate::infra::api::router(orchestrator, metrics.clone(), args.request_deadline_ms);
    let serve_api = async {
        let listener = tokio::net::TcpListener::bind(args.api_address)
            .await
            .expect("api_address must be bindable");
        axum::serve(listener, api).await
    };

    let serve_metrics = crate::infra::metrics::serve(Arc::new(Liveness), args.metrics_address);
    let update_metrics = crate::infra::metrics::run_uptime_gauge(metrics);

    tokio::select! {
        result = serve_api => tracing::error!(?result, "api server exited"),
        result = serve_metrics => tracing::error!(?result, "metrics server exited"),
        _ = update_metrics => (),
    }
}

fn global_metrics_registry() -> &'static prometheus::Registry {
    prometheus::default_registry()
}
