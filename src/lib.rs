//! SQL Procedure Gateway Library
//!
//! This library runs SQL Server stored procedures through a small facade,
//! authenticating either with a static connection string or with cached
//! Azure AD client-credential access tokens.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod gateway;
pub mod models;

pub use config::Config;
pub use error::{GatewayError, GatewayResult, Stage};
pub use gateway::Gateway;
pub use models::{
    AffectedRowCount, ConnectionConfig, NO_ROWS_REPORTED, ParamDirection, ParamValue,
    ProcedureParam, ResultSet, Row, Table, Value,
};
