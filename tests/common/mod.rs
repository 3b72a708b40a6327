//! In-memory driver and token provider shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlproc_gateway::auth::{AccessToken, TokenProvider};
use sqlproc_gateway::db::{ConnectTarget, ConnectionFactory, Driver, DriverConnection};
use sqlproc_gateway::models::{ClientCredentials, ConnectionConfig, ProcedureCall};
use sqlproc_gateway::{Gateway, GatewayError, GatewayResult, ResultSet, Table, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters and captured calls, shared between a driver and its connections.
#[derive(Debug, Default)]
pub struct DriverStats {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub tokens: Mutex<Vec<Option<AccessToken>>>,
    pub calls: Mutex<Vec<ProcedureCall>>,
}

impl DriverStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<ProcedureCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

/// Scripted driver: every connection returns the same tables / row count.
#[derive(Debug, Default)]
pub struct FakeDriver {
    pub stats: Arc<DriverStats>,
    tables: Vec<Table>,
    rows_affected: u64,
    fail_connect: bool,
    fail_command: bool,
    fail_materialization: bool,
    fail_close: bool,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(mut self, tables: Vec<Table>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = rows;
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_command(mut self) -> Self {
        self.fail_command = true;
        self
    }

    /// Results that cannot be turned into tables, e.g. undecodable column data.
    pub fn failing_materialization(mut self) -> Self {
        self.fail_materialization = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn connect(&self, target: &ConnectTarget) -> GatewayResult<Box<dyn DriverConnection>> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        self.stats
            .tokens
            .lock()
            .unwrap()
            .push(target.access_token().cloned());

        if self.fail_connect {
            return Err(GatewayError::connection(
                "connection refused",
                "Check network connectivity",
            ));
        }

        Ok(Box::new(FakeConnection {
            stats: Arc::clone(&self.stats),
            tables: self.tables.clone(),
            rows_affected: self.rows_affected,
            fail_command: self.fail_command,
            fail_materialization: self.fail_materialization,
            fail_close: self.fail_close,
        }))
    }
}

struct FakeConnection {
    stats: Arc<DriverStats>,
    tables: Vec<Table>,
    rows_affected: u64,
    fail_command: bool,
    fail_materialization: bool,
    fail_close: bool,
}

impl FakeConnection {
    fn record(&self, call: &ProcedureCall) -> GatewayResult<()> {
        self.stats.calls.lock().unwrap().push(call.clone());
        if self.fail_command {
            return Err(GatewayError::execution(
                call.name(),
                "Could not find stored procedure",
                Some(2812),
                "Check the procedure name and schema",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DriverConnection for FakeConnection {
    async fn query(&mut self, call: &ProcedureCall) -> GatewayResult<ResultSet> {
        self.record(call)?;
        if self.fail_materialization {
            return Err(GatewayError::materialization(
                call.name(),
                "invalid UTF-16 in column c2",
            ));
        }
        let mut result = ResultSet::new(self.tables.clone());
        if call.has_output_params() {
            result.split_output_values();
        }
        Ok(result)
    }

    async fn execute(&mut self, call: &ProcedureCall) -> GatewayResult<u64> {
        self.record(call)?;
        Ok(self.rows_affected)
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(GatewayError::connection("socket already closed", "none"));
        }
        Ok(())
    }
}

/// Issues "token-N" tokens with a fixed lifetime and remembers each one.
#[derive(Debug)]
pub struct FakeTokenProvider {
    calls: AtomicUsize,
    lifetime: chrono::Duration,
    delay: Duration,
    fail: bool,
    pub issued: Mutex<Vec<AccessToken>>,
}

impl FakeTokenProvider {
    pub fn new(lifetime: chrono::Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            lifetime,
            delay: Duration::ZERO,
            fail: false,
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Tokens that are already expired when issued.
    pub fn expired() -> Self {
        Self::new(chrono::Duration::seconds(-1))
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(chrono::Duration::hours(1))
        }
    }

    /// Sleep before answering, to widen races between concurrent callers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for FakeTokenProvider {
    async fn acquire_token(&self, credentials: &ClientCredentials) -> GatewayResult<AccessToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(GatewayError::auth(
                format!("AADSTS7000215: invalid client secret for {}", credentials.app_id),
                "Check the application secret",
            ));
        }
        let token = AccessToken::expiring_in(format!("token-{n}"), self.lifetime);
        self.issued.lock().unwrap().push(token.clone());
        Ok(token)
    }
}

pub fn static_config() -> ConnectionConfig {
    ConnectionConfig::static_credential("Server=tcp:db.local,1433;User Id=app;Password=hunter2")
        .unwrap()
}

pub fn token_config() -> ConnectionConfig {
    ConnectionConfig::token_auth(
        "sales.database.windows.net",
        "sales",
        "00000000-0000-0000-0000-000000000001",
        "app-id",
        "app-secret",
    )
    .unwrap()
}

pub fn factory(
    config: ConnectionConfig,
    driver: &Arc<FakeDriver>,
    provider: &Arc<FakeTokenProvider>,
) -> ConnectionFactory {
    ConnectionFactory::new(config, driver.clone(), provider.clone())
}

pub fn gateway(
    config: ConnectionConfig,
    driver: &Arc<FakeDriver>,
    provider: &Arc<FakeTokenProvider>,
) -> Gateway {
    Gateway::with_components(config, driver.clone(), provider.clone())
}

/// A two-column table with `n` rows: (i, "row-i").
pub fn numbered_table(n: usize) -> Table {
    let mut table = Table::new(vec!["c1".to_string(), "c2".to_string()]);
    for i in 0..n {
        table
            .push_row(vec![Value::Int(i as i64), Value::Text(format!("row-{i}"))])
            .unwrap();
    }
    table
}
