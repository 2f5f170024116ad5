//! OAuth2 client-credentials token cache (spec.md §4.1, component C1).
//!
//! A single cached token is shared by every in-flight request. On a 401,
//! callers invoke [`TokenCache::refresh`] naming the token they were
//! rejected with; concurrent refreshers collapse into one upstream call via
//! a dedup lock, mirroring the single-flight pattern used for circuit-
//! breaker state below.

use crate::error::EstimateError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub id_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self) -> Result<CachedToken, EstimateError>;
}

pub struct TokenCache {
    issuer: Arc<dyn TokenIssuer>,
    slot: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            issuer,
            slot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns a usable token, fetching one if none is cached or the cached
    /// one has expired.
    pub async fn get(&self) -> Result<CachedToken, EstimateError> {
        if let Some(token) = self.fresh_cached().await {
            return Ok(token);
        }
        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.fresh_cached().await {
            return Ok(token);
        }
        self.issue_and_store().await
    }

    /// Replaces the cached token (spec.md §4.1's `set` operation).
    pub async fn set(&self, token: CachedToken) {
        *self.slot.write().await = Some(token);
    }

    /// Empties the cache (spec.md §4.1's `clear` operation).
    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }

    /// Forces a refresh after `rejected` was turned down with a 401 by an
    /// upstream call. Concurrent callers rejected around the same time
    /// collapse into one issuer call: a caller that loses the race to the
    /// lock re-checks the cache once it acquires it, but only accepts what
    /// it finds there if it differs from the token that was just rejected —
    /// a fresh-looking cached value that's the same stale token must be
    /// reissued regardless of its `expires_at`.
    pub async fn refresh(&self, rejected: &str) -> Result<CachedToken, EstimateError> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.fresh_cached().await {
            if token.access_token != rejected {
                return Ok(token);
            }
        }
        self.issue_and_store().await
    }

    async fn issue_and_store(&self) -> Result<CachedToken, EstimateError> {
        let result = self.issuer.issue().await;
        match &result {
            Ok(token) => self.set(token.clone()).await,
            Err(err) => tracing::warn!(?err, "token refresh failed"),
        }
        result
    }

    async fn fresh_cached(&self) -> Option<CachedToken> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(token) if !token.is_expired(Utc::now()) => Some(token.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIssuer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue(&self) -> Result<CachedToken, EstimateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CachedToken {
                access_token: "token".to_string(),
                id_token: "id".to_string(),
                expires_at: Utc::now() + chrono::Duration::seconds(60),
            })
        }
    }

    #[tokio::test]
    async fn concurrent_refresh_collapses_to_one_issue_call() {
        let issuer = Arc::new(CountingIssuer {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(TokenCache::new(issuer.clone()));

        let futs: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await.unwrap() })
            })
            .collect();
        for fut in futs {
            fut.await.unwrap();
        }
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_reissues_when_rejected_token_still_looks_fresh() {
        let issuer = Arc::new(CountingIssuer {
            calls: AtomicUsize::new(0),
        });
        let cache = TokenCache::new(issuer.clone());
        let stale = cache.get().await.unwrap();
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);

        // Cache still holds `stale` (not expired by clock), but upstream
        // just rejected it with a 401 — refresh must not short-circuit.
        let refreshed = cache.refresh(&stale.access_token).await.unwrap();
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.access_token, "token");
    }

    #[tokio::test]
    async fn clear_forces_next_get_to_reissue() {
        let issuer = Arc::new(CountingIssuer {
            calls: AtomicUsize::new(0),
        });
        let cache = TokenCache::new(issuer.clone());
        cache.get().await.unwrap();
        cache.clear().await;
        cache.get().await.unwrap();
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    }
}
