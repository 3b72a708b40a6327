//! Driver seam and per-call connection handles.
//!
//! The gateway talks to the database only through the `Driver` and
//! `DriverConnection` traits. `ConnectionHandle` wraps one logical connection:
//! it is created without network I/O, opened on first use, and released
//! exactly once.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::AccessToken;
use crate::error::GatewayResult;
use crate::models::connection::mask_connection_string;
use crate::models::{ProcedureCall, ResultSet};

/// Opens connections to the database.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a network connection to `target`, authenticating with its token if present.
    async fn connect(&self, target: &ConnectTarget) -> GatewayResult<Box<dyn DriverConnection>>;
}

/// An open database connection owned by a single call.
#[async_trait]
pub trait DriverConnection: Send {
    /// Run a stored procedure and read back every result table.
    async fn query(&mut self, call: &ProcedureCall) -> GatewayResult<ResultSet>;

    /// Run a stored procedure as a non-query and return the affected-row count.
    async fn execute(&mut self, call: &ProcedureCall) -> GatewayResult<u64>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> GatewayResult<()>;
}

/// Where and how to connect: a connection string plus an optional access token.
#[derive(Clone)]
pub struct ConnectTarget {
    connection_string: String,
    access_token: Option<AccessToken>,
}

impl ConnectTarget {
    pub fn new(connection_string: impl Into<String>, access_token: Option<AccessToken>) -> Self {
        Self {
            connection_string: connection_string.into(),
            access_token,
        }
    }

    /// Contains sensitive data for static credentials - never log.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }
}

impl std::fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectTarget")
            .field(
                "connection_string",
                &mask_connection_string(&self.connection_string),
            )
            .field("access_token", &self.access_token)
            .finish()
    }
}

/// A per-call connection handle.
///
/// Prefer `release().await`; dropping an open handle closes the socket
/// without the driver's orderly shutdown.
pub struct ConnectionHandle {
    target: ConnectTarget,
    driver: Arc<dyn Driver>,
    connection: Option<Box<dyn DriverConnection>>,
    released: bool,
}

impl ConnectionHandle {
    /// Create a handle without touching the network.
    pub fn new(target: ConnectTarget, driver: Arc<dyn Driver>) -> Self {
        Self {
            target,
            driver,
            connection: None,
            released: false,
        }
    }

    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the network connection if it is not open yet.
    pub async fn open(&mut self) -> GatewayResult<&mut (dyn DriverConnection + 'static)> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                debug!(
                    token_auth = self.target.access_token.is_some(),
                    "Opening database connection"
                );
                self.driver.connect(&self.target).await?
            }
        };
        Ok(&mut **self.connection.insert(connection))
    }

    /// Close the connection (if it was opened) and consume the handle.
    ///
    /// A close failure is logged and otherwise ignored so it never masks the
    /// outcome of the call that used the handle.
    pub async fn release(mut self) {
        self.released = true;
        if let Some(connection) = self.connection.take() {
            match connection.close().await {
                Ok(()) => debug!("Database connection released"),
                Err(e) => warn!(error = %e, "Failed to close database connection"),
            }
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if !self.released && self.connection.is_some() {
            warn!("Connection handle dropped while open - consider using explicit release()");
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("target", &self.target)
            .field("open", &self.is_open())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_target_debug_hides_secrets() {
        let target = ConnectTarget::new(
            "Server=db;Password=hunter2",
            Some(AccessToken::expiring_in("eyJ0eXAiOiJKV1Qi", Duration::minutes(5))),
        );
        let debug = format!("{:?}", target);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("eyJ0eXAiOiJKV1Qi"));
    }
}
