//! Single-slot access token cache.
//!
//! The cache holds at most one token. Checking its expiry and replacing it
//! happen under the same lock guard, so concurrent callers never observe a
//! half-written token and queue behind a refresh already in progress.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::provider::TokenProvider;
use super::token::AccessToken;
use crate::error::GatewayResult;
use crate::models::ClientCredentials;

pub struct TokenCache {
    credentials: ClientCredentials,
    provider: Arc<dyn TokenProvider>,
    /// Tokens expiring within this window are treated as already expired
    refresh_skew: Duration,
    current: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// Create an empty cache; the first `get_valid_token` call acquires a token.
    pub fn new(credentials: ClientCredentials, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            credentials,
            provider,
            refresh_skew: Duration::zero(),
            current: Mutex::new(None),
        }
    }

    /// Refresh tokens this long before their reported expiry.
    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew.max(Duration::zero());
        self
    }

    /// Return the cached token if it is still valid, otherwise acquire a new one.
    ///
    /// A failed acquisition is returned to the caller as is; the stale token
    /// stays in place and the next call tries again.
    pub async fn get_valid_token(&self) -> GatewayResult<AccessToken> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            let now = Utc::now() + self.refresh_skew;
            if token.is_valid_at(now) {
                debug!(expires_at = %token.expires_at(), "Using cached access token");
                return Ok(token.clone());
            }
            debug!(expires_at = %token.expires_at(), "Cached access token expired");
        }

        let token = match self.provider.acquire_token(&self.credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    tenant_id = %self.credentials.tenant_id,
                    app_id = %self.credentials.app_id,
                    error = %e,
                    "Failed to acquire access token"
                );
                return Err(e);
            }
        };

        info!(
            tenant_id = %self.credentials.tenant_id,
            app_id = %self.credentials.app_id,
            expires_at = %token.expires_at(),
            "Acquired access token"
        );
        *current = Some(token.clone());
        Ok(token)
    }

    /// Snapshot of the cached token, if any.
    pub async fn current(&self) -> Option<AccessToken> {
        self.current.lock().await.clone()
    }

    /// Drop the cached token so the next call acquires a fresh one.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("credentials", &self.credentials)
            .field("refresh_skew", &self.refresh_skew)
            .finish_non_exhaustive()
    }
}
