//! OAuth2 client implementation with PKCE support.

use crate::config::{AccessTokenTransport, OAuth2Config, OAuth2ProviderConfig};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::state::{OAuth2State, OAuth2StateStore};
use crate::types::{AuthorizationResponse, HttpResponse, TokenResponse};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, thread_rng};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, redirect};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// PKCE code challenge and verifier
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

impl PkceChallenge {
    pub fn new() -> Self {
        let code_verifier = Self::generate_code_verifier();
        let code_challenge = Self::generate_code_challenge(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: "S256".to_string(),
        }
    }

    fn generate_code_verifier() -> String {
        let mut rng = thread_rng();
        let bytes: Vec<u8> = (0..64).map(|_| rng.r#gen::<u8>()).collect();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn generate_code_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }
}

/// OAuth2 client bound to a single provider.
///
/// Cloning is cheap; clones share the HTTP connection pool and the state store.
#[derive(Clone)]
pub struct OAuth2Client {
    http_client: Client,
    provider_config: Arc<OAuth2ProviderConfig>,
    state_store: Arc<dyn OAuth2StateStore>,
    state_ttl_seconds: u64,
}

impl OAuth2Client {
    /// Build a client for `provider_config`.
    ///
    /// Redirects are never followed: a redirected resource request would
    /// carry the access token to wherever the provider points.
    pub fn new(
        provider_config: OAuth2ProviderConfig,
        state_store: Arc<dyn OAuth2StateStore>,
        settings: &OAuth2Config,
    ) -> OAuth2Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_seconds))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            provider_config: Arc::new(provider_config),
            state_store,
            state_ttl_seconds: settings.state_ttl_seconds,
        })
    }

    pub fn provider_config(&self) -> &OAuth2ProviderConfig {
        &self.provider_config
    }

    pub fn state_store(&self) -> &Arc<dyn OAuth2StateStore> {
        &self.state_store
    }

    /// Generate the authorization URL and the `state` it was issued with
    pub async fn authorization_url(
        &self,
        additional_params: HashMap<String, String>,
    ) -> OAuth2Result<(String, String)> {
        let config = &self.provider_config;
        let mut url = Url::parse(&config.authorization_endpoint)?;

        let pkce = config.use_pkce.then(PkceChallenge::new);

        let state = OAuth2State::new(
            config.provider_id.clone(),
            config.redirect_uri.clone(),
            pkce.as_ref().map(|p| p.code_verifier.clone()),
            self.state_ttl_seconds,
        );
        let state_param = state.state.clone();
        self.state_store.store(state).await?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &config.client_id);
            params.append_pair("redirect_uri", &config.redirect_uri);
            params.append_pair("state", &state_param);

            if !config.scopes.is_empty() {
                params.append_pair("scope", &config.scopes.join(" "));
            }

            if let Some(pkce) = &pkce {
                params.append_pair("code_challenge", &pkce.code_challenge);
                params.append_pair("code_challenge_method", &pkce.code_challenge_method);
            }

            for (key, value) in config.auth_params.iter().chain(&additional_params) {
                params.append_pair(key, value);
            }
        }

        debug!(
            "Generated authorization URL for provider {}",
            config.provider_id
        );

        Ok((url.to_string(), state_param))
    }

    /// Validate the callback and exchange its code for tokens
    pub async fn handle_callback(
        &self,
        callback_response: AuthorizationResponse,
    ) -> OAuth2Result<TokenResponse> {
        // State is consumed even when the provider reports an error
        let state = self.state_store.retrieve(&callback_response.state).await?;

        if state.provider_id != self.provider_config.provider_id {
            return Err(OAuth2Error::InvalidState);
        }

        if let Some(error) = &callback_response.error {
            let error_desc = callback_response
                .error_description
                .as_deref()
                .unwrap_or("No description");
            return Err(OAuth2Error::CallbackError(format!(
                "{}: {}",
                error, error_desc
            )));
        }

        let code = callback_response
            .code
            .as_deref()
            .ok_or(OAuth2Error::MissingAuthorizationCode)?;

        self.exchange_code(code, state.code_verifier.as_deref())
            .await
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> OAuth2Result<TokenResponse> {
        let config = &self.provider_config;
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];

        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier));
        }

        let token_response = self.request_token(&params).await?;
        info!("Successfully exchanged code for tokens");
        Ok(token_response)
    }

    /// Obtain a fresh access token with a refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> OAuth2Result<TokenResponse> {
        let config = &self.provider_config;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];

        let token_response = self.request_token(&params).await?;
        info!("Successfully refreshed access token");
        Ok(token_response)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> OAuth2Result<TokenResponse> {
        let response = self
            .http_client
            .post(&self.provider_config.token_endpoint)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            error!(status = response.status().as_u16(), "Token request failed");
            let error_text = response.text().await.unwrap_or_default();
            return Err(OAuth2Error::TokenExchangeFailed(error_text));
        }

        response
            .json()
            .await
            .map_err(|e| OAuth2Error::InvalidTokenResponse(e.to_string()))
    }

    /// Issue a request against a protected resource.
    ///
    /// When an access token is given it is appended to the query string as
    /// `access_token`; this helper never adds an `Authorization` header.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<String>,
        access_token: Option<&str>,
    ) -> OAuth2Result<HttpResponse> {
        let mut url = Url::parse(url)?;
        if let Some(token) = access_token {
            // Replace any token already present on the URL
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "access_token")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();

            url.query_pairs_mut()
                .clear()
                .extend_pairs(pairs)
                .append_pair("access_token", token);
        }

        debug!(%method, host = url.host_str(), path = url.path(), "Sending resource request");

        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            error!(status, "Resource request failed");
            return Err(OAuth2Error::RequestFailed { status, body });
        }

        Ok(HttpResponse { status, body })
    }

    /// GET a protected resource, sending the token as configured by
    /// [`AccessTokenTransport`]
    pub async fn get(&self, url: &str, access_token: &str) -> OAuth2Result<HttpResponse> {
        let transport = self.provider_config.access_token_transport;

        let mut headers = HeaderMap::new();
        if transport != AccessTokenTransport::Query {
            let value = HeaderValue::from_str(&format!("Bearer {}", access_token))?;
            headers.insert(AUTHORIZATION, value);
        }

        let query_token =
            (transport != AccessTokenTransport::AuthorizationHeader).then_some(access_token);

        self.request(Method::GET, url, headers, None, query_token)
            .await
    }
}
