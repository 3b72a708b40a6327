//! Error types for the SQL procedure gateway.
//!
//! Every failure is tagged with the stage that produced it (authentication,
//! connection, command execution, result materialization) so callers can tell
//! where a call broke without inspecting driver internals.

use thiserror::Error;

/// The stage of a gateway call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configuration,
    Auth,
    Connection,
    Execution,
    Materialization,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Auth => write!(f, "auth"),
            Self::Connection => write!(f, "connection"),
            Self::Execution => write!(f, "execution"),
            Self::Materialization => write!(f, "materialization"),
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String, suggestion: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Execution of '{procedure}' failed: {message}")]
    Execution {
        procedure: String,
        message: String,
        /// SQL Server error number, e.g. 2812 for "could not find stored procedure"
        code: Option<u32>,
        suggestion: String,
    },

    #[error("Reading results of '{procedure}' failed: {message}")]
    Materialization { procedure: String, message: String },
}

impl GatewayError {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an authentication error with a helpful suggestion.
    pub fn auth(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an execution error with an optional server error number.
    pub fn execution(
        procedure: impl Into<String>,
        message: impl Into<String>,
        code: Option<u32>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Execution {
            procedure: procedure.into(),
            message: message.into(),
            code,
            suggestion: suggestion.into(),
        }
    }

    /// Create a materialization error.
    pub fn materialization(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Materialization {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    /// The stage this error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidConfig { .. } => Stage::Configuration,
            Self::Auth { .. } => Stage::Auth,
            Self::Connection { .. } => Stage::Connection,
            Self::Execution { .. } => Stage::Execution,
            Self::Materialization { .. } => Stage::Materialization,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Auth { suggestion, .. } => Some(suggestion),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQL Server error number reported for a failed command, if any.
    pub fn server_code(&self) -> Option<u32> {
        match self {
            Self::Execution { code, .. } => *code,
            _ => None,
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<crate::models::ConnectionConfigError> for GatewayError {
    fn from(err: crate::models::ConnectionConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::connection("Failed to connect", "Check the server name");
        assert!(err.to_string().contains("Connection failed"));

        let err = GatewayError::execution("dbo.GetUsers", "Invalid object", Some(208), "check");
        let msg = err.to_string();
        assert!(msg.contains("dbo.GetUsers"));
        assert!(msg.contains("Invalid object"));
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(GatewayError::auth("bad secret", "x").stage(), Stage::Auth);
        assert_eq!(
            GatewayError::connection("refused", "x").stage(),
            Stage::Connection
        );
        assert_eq!(
            GatewayError::execution("p", "boom", None, "x").stage(),
            Stage::Execution
        );
        assert_eq!(
            GatewayError::materialization("p", "ragged row").stage(),
            Stage::Materialization
        );
        assert_eq!(
            GatewayError::invalid_config("empty").stage(),
            Stage::Configuration
        );
    }

    #[test]
    fn test_error_suggestion() {
        let err = GatewayError::auth("AADSTS7000215", "Verify the application secret");
        assert_eq!(err.suggestion(), Some("Verify the application secret"));
        assert_eq!(GatewayError::materialization("p", "m").suggestion(), None);
    }

    #[test]
    fn test_server_code() {
        let err = GatewayError::execution("p", "Could not find stored procedure", Some(2812), "s");
        assert_eq!(err.server_code(), Some(2812));
        assert_eq!(GatewayError::connection("m", "s").server_code(), None);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Auth.to_string(), "auth");
        assert_eq!(Stage::Materialization.to_string(), "materialization");
    }
}
