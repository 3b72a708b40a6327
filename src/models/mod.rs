//! Data models for the SQL procedure gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod procedure;
pub mod result;

// Re-export commonly used types
pub use connection::{ClientCredentials, ConnectionConfig, ConnectionConfigError, TokenAuthConfig};
pub use procedure::{ParamDirection, ParamValue, ProcedureCall, ProcedureParam};
pub use result::{
    AffectedRowCount, NO_ROWS_REPORTED, ResultSet, Row, Table, TableShapeError, Value,
};

/// Custom serialization for binary data as base64.
pub(crate) mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
