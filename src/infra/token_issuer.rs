//! OAuth2 client-credentials issuer backing the [`crate::infra::token::TokenCache`]
//! (spec.md §6: token issuer returns `{ access_token, id_token, token_type, expires_in }`).

use crate::error::EstimateError;
use crate::infra::token::{CachedToken, TokenIssuer};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    id_token: String,
    expires_in: i64,
}

pub struct HttpTokenIssuer {
    http: reqwest::Client,
    url: Url,
}

impl HttpTokenIssuer {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self) -> Result<CachedToken, EstimateError> {
        let response = self
            .http
            .post(self.url.clone())
            .send()
            .await
            .map_err(|err| EstimateError::Unauthorized {
                message: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EstimateError::Unauthorized {
                message: format!("token issuer returned status {}", response.status()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|err| EstimateError::Unauthorized {
            message: format!("bad token response body: {err}"),
        })?;

        Ok(CachedToken {
            access_token: body.access_token,
            id_token: body.id_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    }
}
