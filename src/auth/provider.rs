//! Identity-provider clients.
//!
//! `AzureAdProvider` performs the OAuth 2.0 client-credentials grant against
//! the Azure AD v1 token endpoint and returns a token scoped to Azure SQL.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use tracing::debug;
use url::Url;

use super::token::AccessToken;
use crate::error::{GatewayError, GatewayResult};
use crate::models::ClientCredentials;

/// Authority that issues tokens for public Azure.
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com/";

/// Resource identifier for Azure SQL Database.
pub const DEFAULT_SQL_RESOURCE: &str = "https://database.windows.net/";

/// Acquires access tokens on behalf of an application.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a fresh token. Failures are reported as `GatewayError::Auth`.
    async fn acquire_token(&self, credentials: &ClientCredentials) -> GatewayResult<AccessToken>;
}

/// Azure AD client-credentials provider.
#[derive(Debug, Clone)]
pub struct AzureAdProvider {
    authority: Url,
    resource: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds until expiry; the v1 endpoint sends it as a string
    #[serde(default, deserialize_with = "lenient_u64")]
    expires_in: Option<u64>,
    /// Unix timestamp of expiry
    #[serde(default, deserialize_with = "lenient_u64")]
    expires_on: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl AzureAdProvider {
    /// Create a provider for public Azure and the Azure SQL resource.
    pub fn new() -> GatewayResult<Self> {
        Self::with_endpoints(DEFAULT_AUTHORITY_URL, DEFAULT_SQL_RESOURCE)
    }

    /// Create a provider for a specific authority (e.g. a sovereign cloud) and resource.
    pub fn with_endpoints(authority: &str, resource: impl Into<String>) -> GatewayResult<Self> {
        let mut authority = Url::parse(authority).map_err(|e| {
            GatewayError::invalid_config(format!("Invalid authority URL '{}': {}", authority, e))
        })?;
        if !authority.path().ends_with('/') {
            let path = format!("{}/", authority.path());
            authority.set_path(&path);
        }

        let resource = resource.into();
        if resource.trim().is_empty() {
            return Err(GatewayError::invalid_config("Token resource cannot be empty"));
        }

        Ok(Self {
            authority,
            resource,
            http: reqwest::Client::new(),
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Token endpoint for a tenant: `{authority}{tenant}/oauth2/token`.
    pub fn token_endpoint(&self, tenant_id: &str) -> GatewayResult<Url> {
        let valid = !tenant_id.is_empty()
            && tenant_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !tenant_id.starts_with('.');
        if !valid {
            return Err(GatewayError::auth(
                format!("Invalid tenant id '{}'", tenant_id),
                "Use the directory (tenant) GUID or its verified domain name",
            ));
        }

        self.authority
            .join(&format!("{}/oauth2/token", tenant_id))
            .map_err(|e| {
                GatewayError::auth(
                    format!("Failed to build token endpoint: {}", e),
                    "Check the authority URL",
                )
            })
    }
}

#[async_trait]
impl TokenProvider for AzureAdProvider {
    async fn acquire_token(&self, credentials: &ClientCredentials) -> GatewayResult<AccessToken> {
        let endpoint = self.token_endpoint(&credentials.tenant_id)?;
        debug!(
            endpoint = %endpoint,
            app_id = %credentials.app_id,
            resource = %self.resource,
            "Requesting access token"
        );

        let resp = self
            .http
            .post(endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.app_id.as_str()),
                ("client_secret", credentials.app_secret.as_str()),
                ("resource", self.resource.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                GatewayError::auth(
                    format!("Token request failed: {}", e),
                    "Check network connectivity to the identity provider",
                )
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            GatewayError::auth(
                format!("Failed to read token response: {}", e),
                "Check network connectivity to the identity provider",
            )
        })?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        let token_resp: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::auth(
                format!("Failed to parse token response: {}", e),
                "Verify the authority URL points at an OAuth 2.0 token endpoint",
            )
        })?;

        let expires_at = expiry_of(&token_resp, Utc::now())?;
        Ok(AccessToken::new(token_resp.access_token, expires_at))
    }
}

fn error_from_body(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => {
            let suggestion = match err.error.as_str() {
                "invalid_client" | "unauthorized_client" => {
                    "Verify the application id and secret"
                }
                "invalid_request" => "Verify the tenant id and the application registration",
                "invalid_resource" => "Verify the token resource identifier",
                _ => "Check the application registration in Azure AD",
            };
            GatewayError::auth(
                format!(
                    "Identity provider returned {} ({}): {}",
                    status,
                    err.error,
                    err.error_description.unwrap_or_default()
                ),
                suggestion,
            )
        }
        Err(_) => GatewayError::auth(
            format!("Identity provider returned {}: {}", status, body),
            "Check the authority URL and tenant id",
        ),
    }
}

fn expiry_of(resp: &TokenResponse, now: DateTime<Utc>) -> GatewayResult<DateTime<Utc>> {
    let from_lifetime = resp
        .expires_in
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime));
    if let Some(at) = from_lifetime {
        return Ok(at);
    }

    let from_timestamp = resp
        .expires_on
        .and_then(|ts| i64::try_from(ts).ok())
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
    if let Some(at) = from_timestamp {
        return Ok(at);
    }

    Err(GatewayError::auth(
        "Token response carries no usable expiry",
        "Verify the authority URL points at an OAuth 2.0 token endpoint",
    ))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    #[test]
    fn test_token_endpoint() {
        let provider = AzureAdProvider::new().unwrap();
        let url = provider.token_endpoint("contoso.onmicrosoft.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/token"
        );
    }

    #[test]
    fn test_authority_without_trailing_slash() {
        let provider =
            AzureAdProvider::with_endpoints("https://login.microsoftonline.us", "r").unwrap();
        let url = provider.token_endpoint("tenant").unwrap();
        assert_eq!(
            url.as_str(),
            "https://login.microsoftonline.us/tenant/oauth2/token"
        );
    }

    #[test]
    fn test_invalid_tenant_rejected() {
        let provider = AzureAdProvider::new().unwrap();
        for tenant in ["", "../evil", "a/b", "a?b"] {
            let err = provider.token_endpoint(tenant).unwrap_err();
            assert_eq!(err.stage(), Stage::Auth, "tenant {:?}", tenant);
        }
    }

    #[test]
    fn test_invalid_authority_rejected() {
        let err = AzureAdProvider::with_endpoints("not a url", "r").unwrap_err();
        assert_eq!(err.stage(), Stage::Configuration);
    }

    #[test]
    fn test_default_resource_is_azure_sql() {
        assert_eq!(
            AzureAdProvider::new().unwrap().resource(),
            "https://database.windows.net/"
        );
    }

    #[test]
    fn test_parse_v1_response_with_string_expiry() {
        let body = r#"{"token_type":"Bearer","expires_in":"3599","ext_expires_in":"3599",
            "expires_on":"1700003599","resource":"https://database.windows.net/",
            "access_token":"eyJ0eXAi"}"#;
        let resp: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.expires_in, Some(3599));
        assert_eq!(resp.expires_on, Some(1_700_003_599));

        let now = Utc::now();
        assert_eq!(expiry_of(&resp, now).unwrap(), now + Duration::seconds(3599));
    }

    #[test]
    fn test_parse_numeric_expiry() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"t","expires_in":60}"#).unwrap();
        assert_eq!(resp.expires_in, Some(60));
    }

    #[test]
    fn test_expires_on_fallback() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"t","expires_on":"1700000000"}"#).unwrap();
        let at = expiry_of(&resp, Utc::now()).unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_expiry_is_auth_error() {
        let resp: TokenResponse = serde_json::from_str(r#"{"access_token":"t"}"#).unwrap();
        let err = expiry_of(&resp, Utc::now()).unwrap_err();
        assert_eq!(err.stage(), Stage::Auth);
    }

    #[test]
    fn test_error_body_parsed() {
        let body = r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#;
        let err = error_from_body(401, body);
        assert!(err.to_string().contains("AADSTS7000215"));
        assert_eq!(err.suggestion(), Some("Verify the application id and secret"));
    }

    #[test]
    fn test_unstructured_error_body() {
        let err = error_from_body(502, "Bad Gateway");
        assert!(err.to_string().contains("502"));
        assert_eq!(err.stage(), Stage::Auth);
    }
}
