//! SQL Server driver built on tiberius.
//!
//! Each `connect` opens one TDS connection. Token-authenticated targets log in
//! with the Azure AD access token instead of a SQL password; Azure SQL gateway
//! redirects are followed once.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tiberius::error::Error as TdsError;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::driver::{ConnectTarget, Driver, DriverConnection};
use super::statement::{StatementError, render_call};
use super::{params, types};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ProcedureCall, ResultSet, Table};

type MssqlClient = Client<Compat<TcpStream>>;

/// Production driver: plain TCP plus TDS via tiberius.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiberiusDriver;

impl TiberiusDriver {
    pub fn new() -> Self {
        Self
    }

    fn build_config(target: &ConnectTarget) -> GatewayResult<Config> {
        let mut config = Config::from_ado_string(target.connection_string()).map_err(|e| {
            GatewayError::connection(
                format!("Invalid connection string: {}", e),
                "Use an ADO.NET style string, e.g. Server=tcp:host,1433;Database=db;User Id=..;Password=..",
            )
        })?;
        if let Some(token) = target.access_token() {
            config.authentication(AuthMethod::aad_token(token.secret()));
            // Azure AD logins are only accepted over TLS
            config.encryption(EncryptionLevel::Required);
        }
        Ok(config)
    }

    async fn connect_client(config: Config) -> Result<MssqlClient, TdsError> {
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Client::connect(config, tcp.compat_write()).await
    }
}

#[async_trait]
impl Driver for TiberiusDriver {
    async fn connect(&self, target: &ConnectTarget) -> GatewayResult<Box<dyn DriverConnection>> {
        let mut config = Self::build_config(target)?;

        let client = match Self::connect_client(config.clone()).await {
            Err(TdsError::Routing { host, port }) => {
                debug!(%host, port, "Following SQL Server routing redirect");
                config.host(&host);
                config.port(port);
                Self::connect_client(config).await
            }
            other => other,
        }
        .map_err(connect_error)?;

        debug!("Connected to SQL Server");
        Ok(Box::new(MssqlConnection { client }))
    }
}

/// One open TDS connection.
pub struct MssqlConnection {
    client: MssqlClient,
}

#[async_trait]
impl DriverConnection for MssqlConnection {
    async fn query(&mut self, call: &ProcedureCall) -> GatewayResult<ResultSet> {
        let sql = render_call(call, true).map_err(|e| statement_error(call, e))?;
        let query = params::build_query(sql, call);

        let mut stream = query
            .query(&mut self.client)
            .await
            .map_err(|e| command_error(call.name(), e))?;

        let mut tables: Vec<Table> = Vec::new();
        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|e| command_error(call.name(), e))?
        {
            match item {
                QueryItem::Metadata(meta) => {
                    tables.push(Table::new(types::column_names(meta.columns())));
                }
                QueryItem::Row(row) => {
                    let table = tables.last_mut().ok_or_else(|| {
                        GatewayError::materialization(
                            call.name(),
                            "row received before column metadata",
                        )
                    })?;
                    let values = types::row_values(&row)
                        .map_err(|e| GatewayError::materialization(call.name(), e.to_string()))?;
                    table
                        .push_row(values)
                        .map_err(|e| GatewayError::materialization(call.name(), e.to_string()))?;
                }
            }
        }

        let mut result = ResultSet::new(tables);
        if call.has_output_params() {
            result.split_output_values();
        }
        Ok(result)
    }

    /// The count is tiberius' `ExecuteResult::total()`: the sum of every DONE
    /// token in the batch. Rows returned by SELECTs inside the procedure are
    /// included unless it runs with `SET NOCOUNT ON`, so the figure can exceed
    /// the INSERT/UPDATE/DELETE-only count ADO.NET reports.
    async fn execute(&mut self, call: &ProcedureCall) -> GatewayResult<u64> {
        let sql = render_call(call, false).map_err(|e| statement_error(call, e))?;
        let query = params::build_query(sql, call);

        let result = query
            .execute(&mut self.client)
            .await
            .map_err(|e| command_error(call.name(), e))?;
        Ok(result.total())
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        self.client.close().await.map_err(|e| {
            GatewayError::connection(
                format!("Failed to close connection: {}", e),
                "The server may have already dropped the connection",
            )
        })
    }
}

fn statement_error(call: &ProcedureCall, err: StatementError) -> GatewayError {
    let suggestion = match err {
        StatementError::InvalidProcedureName { .. } => {
            "Use a plain or bracket-quoted name such as dbo.GetUsers"
        }
        StatementError::InvalidParameterName(_) => {
            "Parameter names are letters, digits and '_', optionally prefixed with '@'"
        }
        StatementError::PositionalAfterNamed(_) => {
            "Pass unnamed parameters before named ones"
        }
    };
    GatewayError::execution(call.name(), err.to_string(), None, suggestion)
}

/// Map a failure while connecting or logging in.
fn connect_error(err: TdsError) -> GatewayError {
    match err {
        TdsError::Server(token) => GatewayError::connection(
            format!("Login failed ({}): {}", token.code(), token.message()),
            match token.code() {
                18456 => "Check the login credentials or the access token's tenant and app",
                4060 => "Check that the database exists and the login can access it",
                _ => "Check the connection string and server configuration",
            },
        ),
        TdsError::Io { message, .. } => GatewayError::connection(
            format!("I/O error: {}", message),
            "Check network connectivity and that the server port is reachable",
        ),
        TdsError::Tls(message) => GatewayError::connection(
            format!("TLS error: {}", message),
            "Verify the Encrypt and TrustServerCertificate settings",
        ),
        TdsError::Routing { host, port } => GatewayError::connection(
            format!("Redirected more than once (last to {}:{})", host, port),
            "Connect to the server name reported by the gateway directly",
        ),
        other => GatewayError::connection(
            format!("Protocol error: {}", other),
            "Check database server compatibility",
        ),
    }
}

/// Map a failure while running a procedure.
fn command_error(procedure: &str, err: TdsError) -> GatewayError {
    match err {
        TdsError::Server(token) => {
            let suggestion = match token.code() {
                2812 => "Check the procedure name and schema",
                201 | 8144 | 8145 => "Check the parameter names and count against the procedure",
                229 => "Grant EXECUTE permission on the procedure to this login",
                245 | 8114 => "Check the parameter types against the procedure definition",
                _ => "Check the procedure and its parameters",
            };
            GatewayError::execution(procedure, token.message(), Some(token.code()), suggestion)
        }
        TdsError::Io { message, .. } => GatewayError::connection(
            format!("I/O error: {}", message),
            "The connection was lost while the procedure was running",
        ),
        TdsError::Conversion(message) | TdsError::Encoding(message) => {
            GatewayError::materialization(procedure, message.to_string())
        }
        err @ (TdsError::Utf8 | TdsError::Utf16) => {
            GatewayError::materialization(procedure, err.to_string())
        }
        other => GatewayError::execution(
            procedure,
            other.to_string(),
            None,
            "Check the procedure and its parameters",
        ),
    }
}
