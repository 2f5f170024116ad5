//! Process configuration (spec.md §6, SPEC_FULL.md §6a).

use crate::error::EstimateError;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(clap::Parser)]
pub struct Arguments {
    /// Base URL of the benefits lookup service.
    #[clap(long, env)]
    pub benefits_url: Url,

    /// Base URL of the accumulator balances service.
    #[clap(long, env)]
    pub accumulators_url: Url,

    /// Base URL of the negotiated-rate service.
    #[clap(long, env)]
    pub rates_url: Url,

    /// Base URL of the OAuth2 token issuer.
    #[clap(long, env)]
    pub token_url: Url,

    #[clap(long, env, default_value = "3")]
    pub http_retry_max_attempts: u32,

    #[clap(long, env, default_value = "4")]
    pub http_backoff_min_sec: u64,

    #[clap(long, env, default_value = "10")]
    pub http_backoff_max_sec: u64,

    #[clap(long, env, default_value = "5")]
    pub circuit_threshold: u32,

    #[clap(long, env, default_value = "30")]
    pub circuit_cooldown_sec: u64,

    #[clap(long, env, default_value = "5000")]
    pub request_deadline_ms: u64,

    /// Verify upstream TLS certificates. Disable only for local development.
    #[clap(long, env, default_value = "true", action = clap::ArgAction::Set)]
    pub tls_verify: bool,

    #[clap(long, env, default_value = "0.0.0.0:9589")]
    pub metrics_address: SocketAddr,

    /// How often to refresh the cached PCP specialty-code list. Unset means
    /// refresh once at start-up only.
    #[clap(long, env, value_parser = humantime::parse_duration)]
    pub pcp_refresh_interval: Option<Duration>,

    /// Address the public `/estimate` API listens on.
    #[clap(long, env, default_value = "0.0.0.0:8080")]
    pub api_address: SocketAddr,
}

impl Arguments {
    /// Clap's `required` enforcement covers missing URLs; this covers
    /// malformed ones (spec.md §6a: upstream URLs must be `http`/`https`).
    pub fn validate(&self) -> Result<(), EstimateError> {
        for (name, url) in [
            ("benefits-url", &self.benefits_url),
            ("accumulators-url", &self.accumulators_url),
            ("rates-url", &self.rates_url),
            ("token-url", &self.token_url),
        ] {
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(EstimateError::ConfigError(format!(
                    "{name} must be an http(s) URL, got scheme {:?}",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }

    pub fn backoff_min(&self) -> Duration {
        Duration::from_secs(self.http_backoff_min_sec)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.http_backoff_max_sec)
    }

    pub fn circuit_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_cooldown_sec)
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("benefits_url", &self.benefits_url)
            .field("accumulators_url", &self.accumulators_url)
            .field("rates_url", &self.rates_url)
            .field("token_url", &self.token_url)
            .field("http_retry_max_attempts", &self.http_retry_max_attempts)
            .field("http_backoff_min_sec", &self.http_backoff_min_sec)
            .field("http_backoff_max_sec", &self.http_backoff_max_sec)
            .field("circuit_threshold", &self.circuit_threshold)
            .field("circuit_cooldown_sec", &self.circuit_cooldown_sec)
            .field("request_deadline_ms", &self.request_deadline_ms)
            .field("tls_verify", &self.tls_verify)
            .field("metrics_address", &self.metrics_address)
            .field("pcp_refresh_interval", &self.pcp_refresh_interval)
            .field("api_address", &self.api_address)
            .finish()
    }
}
