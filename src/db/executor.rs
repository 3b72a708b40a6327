//! Stored-procedure execution engine.
//!
//! This module runs procedures through a `ConnectionFactory`:
//! - Read calls return every result table the procedure produces
//! - Non-query calls return the affected-row count
//! - The connection handle is released on every exit path
//!
//! An empty procedure name short-circuits without opening a connection.

use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::factory::ConnectionFactory;
use crate::error::GatewayResult;
use crate::models::{
    AffectedRowCount, NO_ROWS_REPORTED, ProcedureCall, ProcedureParam, ResultSet, Table,
};

/// Procedure executor that handles stored-procedure invocation.
#[derive(Debug, Clone)]
pub struct ProcedureExecutor {
    factory: Arc<ConnectionFactory>,
}

impl ProcedureExecutor {
    /// Create a new executor on top of a connection factory.
    pub fn new(factory: Arc<ConnectionFactory>) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &ConnectionFactory {
        &self.factory
    }

    /// Return the first table produced by the procedure, or an empty table.
    pub async fn fetch_table(
        &self,
        procedure: &str,
        params: &[ProcedureParam],
    ) -> GatewayResult<Table> {
        let result = self.fetch_all(procedure, params).await?;
        Ok(result.into_first_table())
    }

    /// Run the procedure and return every result table it produces.
    pub async fn fetch_all(
        &self,
        procedure: &str,
        params: &[ProcedureParam],
    ) -> GatewayResult<ResultSet> {
        let Some(call) = ProcedureCall::new(procedure, params.to_vec()) else {
            debug!("Empty procedure name, returning empty result set");
            return Ok(ResultSet::default());
        };

        let span = info_span!("fetch_all", call_id = %Uuid::new_v4(), procedure = %call.name());
        async {
            let start = Instant::now();
            debug!(params = call.params().len(), "Executing stored procedure");

            let mut handle = self.factory.open().await?;
            let result = match handle.open().await {
                Ok(connection) => connection.query(&call).await,
                Err(e) => Err(e),
            };
            handle.release().await;

            let result = result?;
            debug!(
                tables = result.len(),
                rows = result.tables.iter().map(Table::row_count).sum::<usize>(),
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Stored procedure returned"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Run the procedure as a non-query and return the affected-row count.
    ///
    /// Returns `NO_ROWS_REPORTED` without connecting when `procedure` is empty.
    pub async fn execute(
        &self,
        procedure: &str,
        params: &[ProcedureParam],
    ) -> GatewayResult<AffectedRowCount> {
        let Some(call) = ProcedureCall::new(procedure, params.to_vec()) else {
            debug!("Empty procedure name, nothing executed");
            return Ok(NO_ROWS_REPORTED);
        };

        let span = info_span!("execute", call_id = %Uuid::new_v4(), procedure = %call.name());
        async {
            let start = Instant::now();
            debug!(params = call.params().len(), "Executing stored procedure as non-query");

            let mut handle = self.factory.open().await?;
            let result = match handle.open().await {
                Ok(connection) => connection.execute(&call).await,
                Err(e) => Err(e),
            };
            handle.release().await;

            let rows_affected = result?;
            debug!(
                rows_affected,
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Stored procedure executed"
            );
            Ok(AffectedRowCount::try_from(rows_affected).unwrap_or(AffectedRowCount::MAX))
        }
        .instrument(span)
        .await
    }
}
