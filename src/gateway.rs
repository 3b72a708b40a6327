//! Public entry point.
//!
//! `Gateway` ties a connection configuration to the production SQL Server
//! driver and Azure AD token provider, and exposes the three procedure
//! operations. It is `Send + Sync`; share it through an `Arc`.

use std::sync::Arc;

use crate::auth::{AzureAdProvider, TokenCache, TokenProvider};
use crate::db::{ConnectionFactory, Driver, ProcedureExecutor, TiberiusDriver};
use crate::error::GatewayResult;
use crate::models::{AffectedRowCount, ConnectionConfig, ProcedureParam, ResultSet, Table};

/// Authenticated stored-procedure gateway.
#[derive(Debug, Clone)]
pub struct Gateway {
    executor: ProcedureExecutor,
}

impl Gateway {
    /// Build a gateway for `config` with the production driver and provider.
    pub fn new(config: ConnectionConfig) -> GatewayResult<Self> {
        let provider = Arc::new(AzureAdProvider::new()?);
        Ok(Self::with_components(
            config,
            Arc::new(TiberiusDriver::new()),
            provider,
        ))
    }

    /// Build a gateway that logs in with a self-contained connection string.
    pub fn with_connection_string(connection_string: impl Into<String>) -> GatewayResult<Self> {
        Self::new(ConnectionConfig::static_credential(connection_string)?)
    }

    /// Build a gateway that logs in with Azure AD client-credential tokens.
    pub fn with_token_auth(
        server: impl Into<String>,
        database: impl Into<String>,
        tenant_id: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> GatewayResult<Self> {
        Self::new(ConnectionConfig::token_auth(
            server, database, tenant_id, app_id, app_secret,
        )?)
    }

    /// Build a gateway from explicit collaborators.
    pub fn with_components(
        config: ConnectionConfig,
        driver: Arc<dyn Driver>,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::from_factory(ConnectionFactory::new(config, driver, provider))
    }

    /// Build a gateway around an already configured factory.
    pub fn from_factory(factory: ConnectionFactory) -> Self {
        Self {
            executor: ProcedureExecutor::new(Arc::new(factory)),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.executor.factory().config()
    }

    /// The token cache, present only for token-authenticated configurations.
    pub fn token_cache(&self) -> Option<&TokenCache> {
        self.executor.factory().token_cache()
    }

    /// Run `procedure` and return its first result table (empty if none).
    pub async fn fetch_table(
        &self,
        procedure: &str,
        params: &[ProcedureParam],
    ) -> GatewayResult<Table> {
        self.executor.fetch_table(procedure, params).await
    }

    /// Run `procedure` and return every result table.
    pub async fn fetch_all(
        &self,
        procedure: &str,
        params: &[ProcedureParam],
    ) -> GatewayResult<ResultSet> {
        self.executor.fetch_all(procedure, params).await
    }

    /// Run `procedure` as a non-query and return the affected-row count,
    /// or `NO_ROWS_REPORTED` when `procedure` is empty.
    pub async fn execute(
        &self,
        procedure: &str,
        params: &[ProcedureParam],
    ) -> GatewayResult<AffectedRowCount> {
        self.executor.execute(procedure, params).await
    }
}
