//! Benefits lookup fetcher (spec.md §4.3, component C3).

use crate::domain::model::{BenefitRequest, BenefitResponse};
use crate::domain::orchestrator::BenefitsClient;
use crate::error::EstimateError;
use crate::infra::http::ResilientClient;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub struct HttpBenefitsClient {
    client: Arc<ResilientClient>,
    url: Url,
}

impl HttpBenefitsClient {
    pub fn new(client: Arc<ResilientClient>, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl BenefitsClient for HttpBenefitsClient {
    async fn fetch(&self, query: &BenefitRequest) -> Result<BenefitResponse, EstimateError> {
        let query_summary = query_summary(query);
        let classify = move |status: u16, body: &str| classify_error(status, body, &query_summary);
        self.client
            .post_json("benefits", self.url.clone(), query, &classify)
            .await
    }
}

fn query_summary(query: &BenefitRequest) -> String {
    format!(
        "{}|{}|{}",
        query.membership_id, query.plan_identifier, query.provider.provider_id
    )
}

/// spec.md §4.3: a 400 naming missing active coverage is a member-level
/// failure, not a benefits-service failure.
fn classify_error(status: u16, body: &str, query_summary: &str) -> EstimateError {
    if status == 400 && body.to_ascii_uppercase().contains("ACTIVE MEMBER COVERAGE NOT FOUND") {
        EstimateError::MemberNotFound {
            query_summary: query_summary.to_string(),
        }
    } else {
        EstimateError::BenefitsNotFound {
            message: format!("benefits service returned status {status}"),
            query_summary: query_summary.to_string(),
        }
    }
}
