//! Accumulator balances fetcher (spec.md §4.3, component C4).

use crate::domain::model::{AccumulatorQuery, AccumulatorResponse};
use crate::domain::orchestrator::AccumulatorsClient;
use crate::error::EstimateError;
use crate::infra::http::ResilientClient;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub struct HttpAccumulatorsClient {
    client: Arc<ResilientClient>,
    url: Url,
}

impl HttpAccumulatorsClient {
    pub fn new(client: Arc<ResilientClient>, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AccumulatorsClient for HttpAccumulatorsClient {
    async fn fetch(&self, query: &AccumulatorQuery) -> Result<AccumulatorResponse, EstimateError> {
        let query_summary = query.membership_id.clone();
        let classify = move |status: u16, body: &str| classify_error(status, body, &query_summary);
        self.client
            .post_json("accumulators", self.url.clone(), query, &classify)
            .await
    }
}

/// spec.md §4.3: a 400 naming missing active coverage is a member-level
/// failure, not an accumulators-service failure.
fn classify_error(status: u16, body: &str, query_summary: &str) -> EstimateError {
    if status == 400 && body.to_ascii_uppercase().contains("ACTIVE MEMBER COVERAGE NOT FOUND") {
        EstimateError::MemberNotFound {
            query_summary: query_summary.to_string(),
        }
    } else {
        EstimateError::AccumulatorUnavailable {
            message: format!("accumulators service returned status {status}"),
            query_summary: query_summary.to_string(),
        }
    }
}
