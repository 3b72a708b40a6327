//! Connection-related data models.
//!
//! This module defines how the gateway reaches its database: either through a
//! static connection string, or through Azure AD application credentials.

use serde::Serialize;

/// Configuration for a database connection.
///
/// The variant is fixed at construction; token authentication is never
/// inferred from which fields happen to be empty.
#[derive(Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// A single opaque ADO.NET connection string carrying its own credentials.
    StaticCredential {
        /// Contains sensitive data - never log
        #[serde(skip_serializing)]
        connection_string: String,
    },
    /// Server and database reached with an identity-provider access token.
    TokenAuth(TokenAuthConfig),
}

impl ConnectionConfig {
    /// Create a static-credential configuration.
    pub fn static_credential(
        connection_string: impl Into<String>,
    ) -> Result<Self, ConnectionConfigError> {
        let connection_string = connection_string.into();
        if connection_string.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyField("connection_string"));
        }
        Ok(Self::StaticCredential { connection_string })
    }

    /// Create a token-authenticated configuration.
    pub fn token_auth(
        server: impl Into<String>,
        database: impl Into<String>,
        tenant_id: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Result<Self, ConnectionConfigError> {
        TokenAuthConfig::new(server, database, tenant_id, app_id, app_secret).map(Self::TokenAuth)
    }

    /// The connection string handed to the driver.
    pub fn connection_string(&self) -> String {
        match self {
            Self::StaticCredential { connection_string } => connection_string.clone(),
            Self::TokenAuth(auth) => auth.connection_string(),
        }
    }

    /// Whether connections need an access token attached.
    pub fn uses_token_auth(&self) -> bool {
        matches!(self, Self::TokenAuth(_))
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        mask_connection_string(&self.connection_string())
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaticCredential { .. } => f
                .debug_struct("StaticCredential")
                .field("connection_string", &self.masked_connection_string())
                .finish(),
            Self::TokenAuth(auth) => f.debug_tuple("TokenAuth").field(auth).finish(),
        }
    }
}

/// Server, database and Azure AD application used for token authentication.
#[derive(Clone, Serialize)]
pub struct TokenAuthConfig {
    pub server: String,
    pub database: String,
    pub tenant_id: String,
    pub app_id: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub app_secret: String,
}

impl TokenAuthConfig {
    /// Create a new token-auth configuration, validating every field.
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        tenant_id: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Result<Self, ConnectionConfigError> {
        let config = Self {
            server: server.into(),
            database: database.into(),
            tenant_id: tenant_id.into(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        };

        for (field, value) in [
            ("server", &config.server),
            ("database", &config.database),
            ("tenant_id", &config.tenant_id),
            ("app_id", &config.app_id),
            ("app_secret", &config.app_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConnectionConfigError::EmptyField(field));
            }
        }

        // Both values are spliced into the connection string verbatim
        for (field, value) in [("server", &config.server), ("database", &config.database)] {
            if value.contains(';') {
                return Err(ConnectionConfigError::InvalidValue {
                    field,
                    reason: "must not contain ';'",
                });
            }
        }

        Ok(config)
    }

    /// Connection string derived from server and database.
    pub fn connection_string(&self) -> String {
        format!(
            "Data Source={};Initial Catalog={}",
            self.server, self.database
        )
    }

    /// Application credentials presented to the identity provider.
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            tenant_id: self.tenant_id.clone(),
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
        }
    }
}

impl std::fmt::Debug for TokenAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("tenant_id", &self.tenant_id)
            .field("app_id", &self.app_id)
            .field("app_secret", &"****")
            .finish()
    }
}

/// Client-credentials grant inputs.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub app_id: String,
    pub app_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("app_id", &self.app_id)
            .field("app_secret", &"****")
            .finish()
    }
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    /// A required field is empty
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A field contains a value that would corrupt the connection string
    #[error("{field} {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

/// Mask password values in an ADO.NET style `key=value;` connection string.
pub fn mask_connection_string(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_secret_key(key) => format!("{}=****", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn is_secret_key(key: &str) -> bool {
    let key = key.trim();
    key.eq_ignore_ascii_case("password") || key.eq_ignore_ascii_case("pwd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_auth_connection_string() {
        let config = ConnectionConfig::token_auth(
            "myserver.database.windows.net",
            "sales",
            "tenant",
            "app",
            "secret",
        )
        .unwrap();

        assert!(config.uses_token_auth());
        assert_eq!(
            config.connection_string(),
            "Data Source=myserver.database.windows.net;Initial Catalog=sales"
        );
    }

    #[test]
    fn test_static_credential_connection_string_is_opaque() {
        let raw = "Server=tcp:db,1433;Database=app;User Id=sa;Password=hunter2";
        let config = ConnectionConfig::static_credential(raw).unwrap();

        assert!(!config.uses_token_auth());
        assert_eq!(config.connection_string(), raw);
    }

    #[test]
    fn test_static_credential_empty_rejected() {
        let result = ConnectionConfig::static_credential("  ");
        assert!(matches!(
            result,
            Err(ConnectionConfigError::EmptyField("connection_string"))
        ));
    }

    #[test]
    fn test_token_auth_empty_fields_rejected() {
        let cases = [
            ("", "db", "t", "a", "s", "server"),
            ("srv", "", "t", "a", "s", "database"),
            ("srv", "db", "", "a", "s", "tenant_id"),
            ("srv", "db", "t", "", "s", "app_id"),
            ("srv", "db", "t", "a", "", "app_secret"),
        ];
        for (server, database, tenant, app, secret, field) in cases {
            let result = TokenAuthConfig::new(server, database, tenant, app, secret);
            match result {
                Err(ConnectionConfigError::EmptyField(f)) => assert_eq!(f, field),
                other => panic!("expected EmptyField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_token_auth_semicolon_rejected() {
        let result = TokenAuthConfig::new("srv;User Id=sa", "db", "t", "a", "s");
        assert!(matches!(
            result,
            Err(ConnectionConfigError::InvalidValue {
                field: "server",
                ..
            })
        ));
    }

    #[test]
    fn test_masked_connection_string() {
        let config =
            ConnectionConfig::static_credential("Server=db;User Id=sa;Password=hunter2;Pwd=x")
                .unwrap();

        let masked = config.masked_connection_string();
        assert!(!masked.contains("hunter2"));
        assert_eq!(masked, "Server=db;User Id=sa;Password=****;Pwd=****");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ConnectionConfig::token_auth("srv", "db", "t", "a", "topsecret").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("srv"));

        let static_config =
            ConnectionConfig::static_credential("Server=db;Password=hunter2").unwrap();
        assert!(!format!("{:?}", static_config).contains("hunter2"));
    }

    #[test]
    fn test_credentials_projection() {
        let auth = TokenAuthConfig::new("srv", "db", "tenant", "app", "secret").unwrap();
        let creds = auth.credentials();
        assert_eq!(creds.tenant_id, "tenant");
        assert_eq!(creds.app_id, "app");
        assert_eq!(creds.app_secret, "secret");
        assert!(!format!("{:?}", creds).contains("\"secret\""));
    }
}
