//! Connection handle construction.

use std::sync::Arc;
use tracing::debug;

use super::driver::{ConnectTarget, ConnectionHandle, Driver};
use crate::auth::{TokenCache, TokenProvider};
use crate::error::GatewayResult;
use crate::models::ConnectionConfig;

/// Builds a fresh `ConnectionHandle` per call, attaching an access token
/// when the configuration uses token authentication.
pub struct ConnectionFactory {
    config: ConnectionConfig,
    driver: Arc<dyn Driver>,
    tokens: Option<TokenCache>,
}

impl ConnectionFactory {
    /// Create a factory. The provider is only consulted for `TokenAuth` configs.
    pub fn new(
        config: ConnectionConfig,
        driver: Arc<dyn Driver>,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        let tokens = match &config {
            ConnectionConfig::TokenAuth(auth) => Some(TokenCache::new(auth.credentials(), provider)),
            ConnectionConfig::StaticCredential { .. } => None,
        };
        Self {
            config,
            driver,
            tokens,
        }
    }

    /// Refresh cached tokens this long before they expire.
    pub fn with_refresh_skew(mut self, skew: chrono::Duration) -> Self {
        self.tokens = self.tokens.map(|cache| cache.with_refresh_skew(skew));
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The token cache, present only for token-authenticated configurations.
    pub fn token_cache(&self) -> Option<&TokenCache> {
        self.tokens.as_ref()
    }

    /// Build a handle that is not yet open on the wire.
    pub async fn open(&self) -> GatewayResult<ConnectionHandle> {
        let access_token = match &self.tokens {
            Some(cache) => Some(cache.get_valid_token().await?),
            None => None,
        };

        debug!(
            connection = %self.config.masked_connection_string(),
            token_auth = access_token.is_some(),
            "Created connection handle"
        );

        let target = ConnectTarget::new(self.config.connection_string(), access_token);
        Ok(ConnectionHandle::new(target, Arc::clone(&self.driver)))
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
