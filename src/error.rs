//! Crate-wide error taxonomy (spec.md §7).
//!
//! Handlers never raise; only fetchers and the orchestrator produce these.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MemberNotFound,
    BenefitsNotFound,
    AccumulatorUnavailable,
    RateNotFound,
    Unauthorized,
    UpstreamTimeout,
    UpstreamUnavailable,
    ConfigError,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EstimateError {
    #[error("member has no active coverage")]
    MemberNotFound { query_summary: String },
    #[error("benefits lookup failed: {message}")]
    BenefitsNotFound { message: String, query_summary: String },
    #[error("accumulators unavailable: {message}")]
    AccumulatorUnavailable { message: String, query_summary: String },
    #[error("negotiated rate not found or not amount-based")]
    RateNotFound { query_summary: String },
    #[error("token refresh failed: {message}")]
    Unauthorized { message: String },
    #[error("upstream call timed out")]
    UpstreamTimeout { query_summary: String },
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable { message: String, query_summary: String },
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl EstimateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MemberNotFound { .. } => ErrorCode::MemberNotFound,
            Self::BenefitsNotFound { .. } => ErrorCode::BenefitsNotFound,
            Self::AccumulatorUnavailable { .. } => ErrorCode::AccumulatorUnavailable,
            Self::RateNotFound { .. } => ErrorCode::RateNotFound,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::UpstreamTimeout { .. } => ErrorCode::UpstreamTimeout,
            Self::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            Self::ConfigError(_) => ErrorCode::ConfigError,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self.code() {
            ErrorCode::MemberNotFound => 404,
            ErrorCode::BenefitsNotFound => 502,
            ErrorCode::AccumulatorUnavailable => 502,
            ErrorCode::RateNotFound => 502,
            ErrorCode::Unauthorized => 502,
            ErrorCode::UpstreamTimeout => 504,
            ErrorCode::UpstreamUnavailable => 502,
            ErrorCode::ConfigError => 500,
        }
    }

    pub fn query_summary(&self) -> String {
        match self {
            Self::MemberNotFound { query_summary }
            | Self::BenefitsNotFound { query_summary, .. }
            | Self::AccumulatorUnavailable { query_summary, .. }
            | Self::RateNotFound { query_summary }
            | Self::UpstreamTimeout { query_summary }
            | Self::UpstreamUnavailable { query_summary, .. } => query_summary.clone(),
            Self::Unauthorized { .. } | Self::ConfigError(_) => String::new(),
        }
    }
}
