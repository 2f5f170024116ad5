//! Resilient HTTP client (spec.md §4.2, §5, component C2).
//!
//! Layering, outside in: circuit breaker → retry with exponential backoff →
//! 401-triggered token refresh → single HTTP call. Circuit state is tracked
//! per endpoint in a `DashMap` so one flaky upstream doesn't trip calls to
//! another. The 401-refresh retry is tracked by its own one-shot counter,
//! kept separate from the ordinary retry budget.

use crate::error::EstimateError;
pub use crate::infra::circuit_breaker::CircuitBreakerConfig;
use crate::infra::circuit_breaker::CircuitBreaker;
use crate::infra::metrics::Metrics;
use crate::infra::token::TokenCache;
use std::sync::Arc;
use std::time::Duration;

pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_min: Duration::from_millis(50),
            backoff_max: Duration::from_secs(2),
        }
    }
}

/// A single upstream call's outcome. Timeouts, 429 and 5xx count as
/// failures toward the breaker and the ordinary retry budget; `Unauthorized`
/// is tracked against its own one-shot refresh budget instead; 4xx other
/// than 401/429 is never retried.
enum Outcome<T> {
    Success(T),
    Retryable(EstimateError),
    Unauthorized(EstimateError),
    Fatal(EstimateError),
}

pub struct ResilientClient {
    http: reqwest::Client,
    tokens: Arc<TokenCache>,
    breaker: CircuitBreaker,
    retry_config: RetryConfig,
    metrics: Arc<Metrics>,
}

impl ResilientClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenCache>, metrics: Arc<Metrics>) -> Self {
        Self::with_config(
            http,
            tokens,
            CircuitBreakerConfig::default(),
            RetryConfig::default(),
            metrics,
        )
    }

    pub fn with_config(
        http: reqwest::Client,
        tokens: Arc<TokenCache>,
        breaker_config: CircuitBreakerConfig,
        retry_config: RetryConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            http,
            tokens,
            breaker: CircuitBreaker::new(breaker_config),
            retry_config,
            metrics,
        }
    }

    /// Sends `request` (POST with a JSON body) to `endpoint`, decoding the
    /// JSON response as `R`. `endpoint` is also the circuit-breaker key.
    /// `classify` maps a non-2xx, non-401/429 status and response body to
    /// the typed error the caller's fetcher contract requires (spec.md
    /// §4.3); it is also consulted for 5xx so the error surfacing after
    /// exhausted retries carries the same typed shape.
    pub async fn post_json<B, R>(
        &self,
        endpoint: &str,
        url: reqwest::Url,
        body: &B,
        classify: &(dyn Fn(u16, &str) -> EstimateError + Sync),
    ) -> Result<R, EstimateError>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        tracing::debug!(endpoint, %url, "upstream fetch");

        if !self.breaker.allow_request(endpoint) {
            self.metrics.record_upstream(endpoint, "circuit_open");
            return Err(EstimateError::UpstreamUnavailable {
                message: "circuit open".to_string(),
                query_summary: endpoint.to_string(),
            });
        }

        let mut retry_attempts = 0u32;
        let mut refresh_used = false;
        loop {
            match self.send_once(url.clone(), body, classify).await {
                Outcome::Success(value) => {
                    self.breaker.record_success(endpoint);
                    self.metrics.record_upstream(endpoint, "success");
                    return Ok(value);
                }
                Outcome::Fatal(err) => {
                    self.breaker.record_failure(endpoint);
                    self.metrics.record_upstream(endpoint, "failure");
                    return Err(err);
                }
                Outcome::Unauthorized(err) => {
                    if refresh_used {
                        self.breaker.record_failure(endpoint);
                        self.metrics.record_upstream(endpoint, "failure");
                        return Err(err);
                    }
                    refresh_used = true;
                    self.metrics.record_upstream(endpoint, "retry");
                }
                Outcome::Retryable(err) => {
                    retry_attempts += 1;
                    if retry_attempts >= self.retry_config.max_attempts {
                        self.breaker.record_failure(endpoint);
                        self.metrics.record_upstream(endpoint, "failure");
                        return Err(err);
                    }
                    self.metrics.record_upstream(endpoint, "retry");
                    tokio::time::sleep(self.backoff_for(retry_attempts)).await;
                }
            }
        }
    }

    async fn send_once<B, R>(
        &self,
        url: reqwest::Url,
        body: &B,
        classify: &(dyn Fn(u16, &str) -> EstimateError + Sync),
    ) -> Outcome<R>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let token = match self.tokens.get().await {
            Ok(token) => token,
            Err(err) => return Outcome::Fatal(err),
        };

        let response = self
            .http
            .post(url.clone())
            .bearer_auth(&token.access_token)
            .header("id_token", &token.id_token)
            .json(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Outcome::Retryable(EstimateError::UpstreamTimeout {
                    query_summary: url.to_string(),
                });
            }
            Err(err) => {
                return Outcome::Retryable(EstimateError::UpstreamUnavailable {
                    message: err.to_string(),
                    query_summary: url.to_string(),
                });
            }
        };

        let status = response.status();

        if status.as_u16() == 401 {
            if let Err(err) = self.tokens.refresh(&token.access_token).await {
                return Outcome::Fatal(err);
            }
            return Outcome::Unauthorized(EstimateError::Unauthorized {
                message: "upstream rejected token, retrying once after refresh".to_string(),
            });
        }

        if status.as_u16() == 429 {
            return Outcome::Retryable(EstimateError::UpstreamUnavailable {
                message: "status 429".to_string(),
                query_summary: url.to_string(),
            });
        }

        if status.is_success() {
            return match response.json::<R>().await {
                Ok(value) => Outcome::Success(value),
                Err(err) => Outcome::Fatal(EstimateError::UpstreamUnavailable {
                    message: format!("bad response body: {err}"),
                    query_summary: url.to_string(),
                }),
            };
        }

        let text = response.text().await.unwrap_or_default();
        let classified = classify(status.as_u16(), &text);
        if status.is_server_error() {
            Outcome::Retryable(classified)
        } else {
            Outcome::Fatal(classified)
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self.retry_config.backoff_min.saturating_mul(1u32 << attempt.min(16));
        exp.clamp(self.retry_config.backoff_min, self.retry_config.backoff_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ResilientClient {
        ResilientClient {
            http: reqwest::Client::new(),
            tokens: Arc::new(TokenCache::new(Arc::new(NoopIssuer))),
            breaker: CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: 2,
                open_duration: Duration::from_millis(10),
            }),
            retry_config: RetryConfig::default(),
            metrics: Metrics::instance(&prometheus::Registry::new())
                .expect("fresh registry accepts metric registration"),
        }
    }

    struct NoopIssuer;
    #[async_trait::async_trait]
    impl crate::infra::token::TokenIssuer for NoopIssuer {
        async fn issue(&self) -> Result<crate::infra::token::CachedToken, EstimateError> {
            Ok(crate::infra::token::CachedToken {
                access_token: "t".to_string(),
                id_token: "id".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::seconds(60),
            })
        }
    }

    #[test]
    fn breaker_opens_after_threshold_failures() {
        let client = client();
        assert!(client.breaker.allow_request("ep"));
        client.breaker.record_failure("ep");
        assert!(client.breaker.allow_request("ep"));
        client.breaker.record_failure("ep");
        assert!(!client.breaker.allow_request("ep"));
    }
}
