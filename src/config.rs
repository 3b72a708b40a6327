//! Configuration handling for the gateway binary.
//!
//! This module provides configuration via CLI arguments and environment variables.

use clap::{Args, Parser, Subcommand};

use crate::auth::{DEFAULT_AUTHORITY_URL, DEFAULT_SQL_RESOURCE};
use crate::format::OutputFormat;
use crate::models::{ConnectionConfig, ConnectionConfigError, ParamValue, ProcedureParam};

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TOKEN_REFRESH_SKEW_SECS: u32 = 0;

/// Configuration for the SQL procedure gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sqlproc-gateway",
    about = "Run SQL Server stored procedures with static or Azure AD token authentication",
    version,
    author
)]
pub struct Config {
    /// Full connection string (sensitive - not logged).
    /// Mutually exclusive with the token authentication options.
    #[arg(
        long,
        value_name = "CONNECTION_STRING",
        env = "SQLGW_CONNECTION_STRING",
        hide_env_values = true,
        conflicts_with_all = ["server", "database", "tenant_id", "app_id", "app_secret"]
    )]
    pub connection_string: Option<String>,

    /// SQL Server host name (token authentication)
    #[arg(long, env = "SQLGW_SERVER")]
    pub server: Option<String>,

    /// Database name (token authentication)
    #[arg(long, env = "SQLGW_DATABASE")]
    pub database: Option<String>,

    /// Azure AD tenant ID (token authentication)
    #[arg(long, env = "SQLGW_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Application (client) ID (token authentication)
    #[arg(long, env = "SQLGW_APP_ID")]
    pub app_id: Option<String>,

    /// Application secret (token authentication, sensitive - not logged)
    #[arg(long, env = "SQLGW_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Identity provider authority URL
    #[arg(long, default_value = DEFAULT_AUTHORITY_URL, env = "SQLGW_AUTHORITY_URL")]
    pub authority_url: String,

    /// Resource the access token is requested for
    #[arg(long, default_value = DEFAULT_SQL_RESOURCE, env = "SQLGW_RESOURCE")]
    pub resource: String,

    /// Refresh cached tokens this many seconds before they expire
    #[arg(
        long,
        default_value_t = DEFAULT_TOKEN_REFRESH_SKEW_SECS,
        env = "SQLGW_TOKEN_REFRESH_SKEW_SECS"
    )]
    pub token_refresh_skew_secs: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "SQLGW_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SQLGW_JSON_LOGS")]
    pub json_logs: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, env = "SQLGW_FORMAT")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// The procedure operation to run.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a procedure and print its first result table
    FetchTable(ProcedureArgs),
    /// Run a procedure and print every result table
    FetchAll(ProcedureArgs),
    /// Run a procedure as a non-query and print the affected-row count
    Execute(ProcedureArgs),
}

impl Command {
    pub fn procedure_args(&self) -> &ProcedureArgs {
        match self {
            Self::FetchTable(args) | Self::FetchAll(args) | Self::Execute(args) => args,
        }
    }
}

/// Procedure name and parameters shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ProcedureArgs {
    /// Procedure name, optionally schema-qualified (e.g. dbo.GetUsers)
    pub procedure: String,

    /// Input parameter as name=value. An empty name (=value) binds positionally.
    /// Values are parsed as JSON scalars, falling back to text.
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub params: Vec<(String, String)>,

    /// Output parameter as name, or name=value for an input/output parameter
    #[arg(short = 'o', long = "output-param", value_name = "NAME[=VALUE]")]
    pub output_params: Vec<String>,
}

impl ProcedureArgs {
    /// Input parameters in command-line order, followed by output parameters.
    pub fn procedure_params(&self) -> Vec<ProcedureParam> {
        let inputs = self
            .params
            .iter()
            .map(|(name, value)| ProcedureParam::input(name.as_str(), ParamValue::parse_literal(value)));
        let outputs = self.output_params.iter().map(|arg| match arg.split_once('=') {
            Some((name, value)) => {
                ProcedureParam::input_output(name, ParamValue::parse_literal(value))
            }
            None => ProcedureParam::output(arg.as_str(), ParamValue::Null),
        });
        inputs.chain(outputs).collect()
    }
}

/// Split `name=value` at the first '='.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the connection configuration from the connection options.
    ///
    /// A connection string selects static credentials; otherwise every
    /// token authentication option is required.
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConnectionConfigError> {
        if let Some(connection_string) = &self.connection_string {
            return ConnectionConfig::static_credential(connection_string.as_str());
        }

        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        ConnectionConfig::token_auth(
            field(&self.server),
            field(&self.database),
            field(&self.tenant_id),
            field(&self.app_id),
            field(&self.app_secret),
        )
    }

    /// Get the token refresh skew as a chrono Duration.
    pub fn token_refresh_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.token_refresh_skew_secs))
    }
}
