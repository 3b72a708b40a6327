//! Access tokens issued by the identity provider.

use chrono::{DateTime, Duration, Utc};

/// A short-lived bearer credential and the instant it stops being valid.
///
/// Tokens are replaced wholesale on refresh and never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Create a token that expires `lifetime` from now.
    pub fn expiring_in(value: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(value, Utc::now() + lifetime)
    }

    /// The raw token. Contains sensitive data - never log.
    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Valid while `now` is strictly before the expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }

    /// A display-safe prefix of the token.
    pub fn masked(&self) -> String {
        mask_token(&self.value)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &self.masked())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(3).collect();
    if token.chars().count() <= 3 {
        "***".to_string()
    } else {
        format!("{}***", prefix)
    }
}
