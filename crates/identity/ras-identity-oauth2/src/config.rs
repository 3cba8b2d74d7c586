//! OAuth2 configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How [`OAuth2Client::get`](crate::OAuth2Client::get) transmits the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTokenTransport {
    /// `access_token` query parameter only
    Query,
    /// `Authorization: Bearer` header only
    #[default]
    AuthorizationHeader,
    /// Both the header and the query parameter
    HeaderAndQuery,
}

/// Endpoints and client credentials of a single OAuth2 provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2ProviderConfig {
    pub provider_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Additional parameters to include in authorization request
    #[serde(default)]
    pub auth_params: HashMap<String, String>,
    /// Whether to use PKCE (recommended for public clients)
    #[serde(default)]
    pub use_pkce: bool,
    #[serde(default)]
    pub access_token_transport: AccessTokenTransport,
}

/// Client-wide settings shared by every provider
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub state_ttl_seconds: u64,
    pub http_timeout_seconds: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            state_ttl_seconds: 600, // 10 minutes
            http_timeout_seconds: 30,
        }
    }
}

impl OAuth2Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
