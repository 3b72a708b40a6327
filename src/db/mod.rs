//! Database access layer.
//!
//! This module provides stored-procedure access to SQL Server:
//! - Driver seam and per-call connection handles
//! - Connection factory with token attachment
//! - Procedure execution
//! - T-SQL statement rendering, parameter binding and type mappings
//! - The tiberius-backed production driver

pub mod driver;
pub mod executor;
pub mod factory;
pub mod mssql;
pub(crate) mod params;
pub mod statement;
pub(crate) mod types;

pub use driver::{ConnectTarget, ConnectionHandle, Driver, DriverConnection};
pub use executor::ProcedureExecutor;
pub use factory::ConnectionFactory;
pub use mssql::TiberiusDriver;
pub use statement::StatementError;
