//! Prometheus metrics and the liveness/metrics HTTP server (spec.md §6b).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::Encoder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Number of seconds the process has been running.
    seconds_alive: prometheus::IntGauge,
    /// Completed `/estimate` requests, labeled by outcome.
    #[metric(labels("outcome"))]
    estimate_requests: prometheus::IntCounterVec,
    /// Upstream calls, labeled by endpoint and outcome (success, retry,
    /// failure, circuit_open).
    #[metric(labels("endpoint", "outcome"))]
    upstream_calls: prometheus::IntCounterVec,
    /// Handler chain hops per request.
    chain_hops: prometheus::Histogram,
    /// Visits per handler id, across all chain runs.
    #[metric(labels("handler"))]
    handler_visits: prometheus::IntCounterVec,
    /// Per-provider resolution outcome, labeled by error code for failures
    /// ("success" for the happy path).
    #[metric(labels("outcome"))]
    provider_outcomes: prometheus::IntCounterVec,
}

impl Metrics {
    pub fn record_estimate(&self, outcome: &str) {
        self.estimate_requests.with_label_values(&[outcome]).inc();
    }

    pub fn record_upstream(&self, endpoint: &str, outcome: &str) {
        self.upstream_calls.with_label_values(&[endpoint, outcome]).inc();
    }

    pub fn observe_chain_hops(&self, hops: usize) {
        self.chain_hops.observe(hops as f64);
    }

    pub fn record_handler_visit(&self, handler: &str) {
        self.handler_visits.with_label_values(&[handler]).inc();
    }

    pub fn record_provider_outcome(&self, outcome: &str) {
        self.provider_outcomes.with_label_values(&[outcome]).inc();
    }
}

#[async_trait::async_trait]
pub trait LivenessChecking: Send + Sync {
    async fn is_alive(&self) -> bool;
}

struct ServerState {
    liveness: Arc<dyn LivenessChecking>,
}

async fn metrics_handler() -> impl IntoResponse {
    let registry = prometheus::default_registry();
    let families = registry.gather();
    let mut buf = Vec::new();
    prometheus::TextEncoder::new()
        .encode(&families, &mut buf)
        .expect("prometheus encoding never fails for well-formed metrics");
    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], buf)
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.liveness.is_alive().await {
        (axum::http::StatusCode::OK, "ok")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "not alive")
    }
}

/// Serves `/metrics` and `/health` forever; intended to be raced against the
/// rest of the process in a `tokio::select!`.
pub async fn serve(liveness: Arc<dyn LivenessChecking>, addr: SocketAddr) -> std::io::Result<()> {
    let state = Arc::new(ServerState { liveness });
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Background task updating the alive-seconds gauge once a second.
pub async fn run_uptime_gauge(metrics: Arc<Metrics>) -> ! {
    let start = Instant::now();
    loop {
        metrics.seconds_alive.set(start.elapsed().as_secs() as i64);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
