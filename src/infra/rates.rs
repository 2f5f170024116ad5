//! Negotiated-rate fetcher (spec.md §4.3, component C5).

use crate::domain::model::{NegotiatedRate, RateQuery};
use crate::domain::orchestrator::RatesClient;
use crate::error::EstimateError;
use crate::infra::http::ResilientClient;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub struct HttpRatesClient {
    client: Arc<ResilientClient>,
    url: Url,
}

impl HttpRatesClient {
    pub fn new(client: Arc<ResilientClient>, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl RatesClient for HttpRatesClient {
    async fn fetch(&self, query: &RateQuery) -> Result<NegotiatedRate, EstimateError> {
        let query_summary = format!("{}|{}", query.provider.provider_id, query.service.procedure_code);
        let classify = move |status: u16, body: &str| classify_error(status, body, &query_summary);
        self.client
            .post_json("rates", self.url.clone(), query, &classify)
            .await
    }
}

/// spec.md §4.3: a 400 naming missing active coverage is a member-level
/// failure, not a rate-service failure. `RateNotFound` stays reserved for
/// the decode-level `found = false`/non-AMOUNT case (spec.md §7), so a wire
/// failure here surfaces as a generic upstream error instead.
fn classify_error(status: u16, body: &str, query_summary: &str) -> EstimateError {
    if status == 400 && body.to_ascii_uppercase().contains("ACTIVE MEMBER COVERAGE NOT FOUND") {
        EstimateError::MemberNotFound {
            query_summary: query_summary.to_string(),
        }
    } else {
        EstimateError::UpstreamUnavailable {
            message: format!("rate service returned status {status}"),
            query_summary: query_summary.to_string(),
        }
    }
}
