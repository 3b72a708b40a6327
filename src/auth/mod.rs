//! Token-based authentication.
//!
//! This module provides access-token handling for connections that
//! authenticate with an Azure AD application instead of a static credential:
//! - The token type and its validity rule
//! - The identity-provider client
//! - The lock-guarded single-token cache

pub mod cache;
pub mod provider;
pub mod token;

pub use cache::TokenCache;
pub use provider::{AzureAdProvider, DEFAULT_AUTHORITY_URL, DEFAULT_SQL_RESOURCE, TokenProvider};
pub use token::AccessToken;
