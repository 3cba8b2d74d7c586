//! Strategy options and endpoint derivation.

use crate::error::{WordPressError, WordPressResult};
use bon::Builder;
use ras_identity_oauth2::{AccessTokenTransport, OAuth2Config, OAuth2ProviderConfig};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

pub const AUTHORIZE_PATH: &str = "/oauth/authorize/";
pub const TOKEN_PATH: &str = "/oauth/token/";
/// The trailing slash matters: without it the server answers with a 301.
pub const PROFILE_PATH: &str = "/oauth/me/";

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_STATE_TTL_SECONDS: u64 = 600;

/// Options for [`WordPressStrategy`](crate::WordPressStrategy)
#[derive(Debug, Clone, Builder, Deserialize)]
pub struct WordPressOptions {
    /// Base URL of the WordPress site, e.g. `https://blog.example.com`
    #[builder(into)]
    pub wordpress_url: Option<String>,

    #[builder(into)]
    pub client_id: String,

    #[builder(into)]
    pub client_secret: String,

    /// URL the server redirects to after the user granted access
    #[builder(into)]
    pub callback_url: String,

    #[builder(into)]
    pub authorization_url: Option<String>,

    #[builder(into)]
    pub token_url: Option<String>,

    #[builder(into)]
    pub profile_url: Option<String>,

    #[builder(default)]
    #[serde(default)]
    pub scope: Vec<String>,

    #[builder(default)]
    #[serde(default)]
    pub use_pkce: bool,

    #[builder(default = DEFAULT_HTTP_TIMEOUT_SECONDS)]
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,

    #[builder(default = DEFAULT_STATE_TTL_SECONDS)]
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_state_ttl() -> u64 {
    DEFAULT_STATE_TTL_SECONDS
}

/// Resolved provider endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPressEndpoints {
    pub authorization_url: String,
    pub token_url: String,
    pub profile_url: String,
}

impl WordPressOptions {
    /// Load options from `WORDPRESS_*` environment variables
    pub fn from_env() -> WordPressResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WordPressResult<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                WordPressError::ConfigError(format!("{} environment variable is required", key))
            })
        };
        let seconds = |key: &str, default: u64| match lookup(key) {
            Some(value) => value.parse().map_err(|_| {
                WordPressError::ConfigError(format!("{} must be a number of seconds", key))
            }),
            None => Ok(default),
        };

        let use_pkce = match lookup("WORDPRESS_USE_PKCE").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(_) => {
                return Err(WordPressError::ConfigError(
                    "WORDPRESS_USE_PKCE must be true or false".to_string(),
                ));
            }
        };

        Ok(Self {
            wordpress_url: lookup("WORDPRESS_URL"),
            client_id: required("WORDPRESS_CLIENT_ID")?,
            client_secret: required("WORDPRESS_CLIENT_SECRET")?,
            callback_url: required("WORDPRESS_CALLBACK_URL")?,
            authorization_url: lookup("WORDPRESS_AUTHORIZATION_URL"),
            token_url: lookup("WORDPRESS_TOKEN_URL"),
            profile_url: lookup("WORDPRESS_PROFILE_URL"),
            scope: lookup("WORDPRESS_SCOPE")
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
            use_pkce,
            http_timeout_seconds: seconds(
                "WORDPRESS_HTTP_TIMEOUT_SECONDS",
                DEFAULT_HTTP_TIMEOUT_SECONDS,
            )?,
            state_ttl_seconds: seconds("WORDPRESS_STATE_TTL_SECONDS", DEFAULT_STATE_TTL_SECONDS)?,
        })
    }

    /// Endpoints derived from `wordpress_url`, with explicit overrides winning.
    ///
    /// Derived URLs are the base URL with the well-known path appended as is.
    pub fn endpoints(&self) -> WordPressResult<WordPressEndpoints> {
        let base = self
            .wordpress_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(WordPressError::MissingWordPressUrl)?;

        let resolve = |explicit: &Option<String>, path: &str| {
            explicit
                .clone()
                .unwrap_or_else(|| format!("{}{}", base, path))
        };

        let endpoints = WordPressEndpoints {
            authorization_url: resolve(&self.authorization_url, AUTHORIZE_PATH),
            token_url: resolve(&self.token_url, TOKEN_PATH),
            profile_url: resolve(&self.profile_url, PROFILE_PATH),
        };

        for (endpoint, url) in [
            ("authorization", &endpoints.authorization_url),
            ("token", &endpoints.token_url),
            ("profile", &endpoints.profile_url),
        ] {
            Url::parse(url).map_err(|source| WordPressError::InvalidEndpoint { endpoint, source })?;
        }

        Ok(endpoints)
    }

    pub(crate) fn provider_config(
        &self,
        provider_id: &str,
        endpoints: &WordPressEndpoints,
    ) -> OAuth2ProviderConfig {
        OAuth2ProviderConfig {
            provider_id: provider_id.to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            authorization_endpoint: endpoints.authorization_url.clone(),
            token_endpoint: endpoints.token_url.clone(),
            redirect_uri: self.callback_url.clone(),
            scopes: self.scope.clone(),
            auth_params: HashMap::new(),
            use_pkce: self.use_pkce,
            access_token_transport: AccessTokenTransport::Query,
        }
    }

    pub(crate) fn client_settings(&self) -> OAuth2Config {
        OAuth2Config::new()
            .with_http_timeout(self.http_timeout_seconds)
            .with_state_ttl(self.state_ttl_seconds)
    }
}
