//! The WordPress strategy.

use crate::error::WordPressResult;
use crate::options::WordPressOptions;
use crate::profile::WordPressProfile;
use async_trait::async_trait;
use ras_identity_oauth2::{
    HttpResponse, IdentityProvider, IdentityResult, InMemoryStateStore, OAuth2Client,
    OAuth2Result, OAuth2StateStore, OAuth2Strategy, TokenResponse, VerifiedIdentity, Verify,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Name the host uses to route requests to this strategy
pub const STRATEGY_NAME: &str = "wordpress";

/// Authenticates users against a WordPress OAuth Server.
///
/// The OAuth2 flow itself is delegated to an [`OAuth2Client`]; this type adds
/// the profile endpoint, the profile mapping and the application's verify
/// callback.
pub struct WordPressStrategy {
    client: OAuth2Client,
    profile_url: String,
    verify: Arc<dyn Verify<WordPressProfile>>,
}

impl WordPressStrategy {
    /// Build a strategy with an in-memory state store.
    ///
    /// Fails with [`WordPressError::MissingWordPressUrl`](crate::WordPressError::MissingWordPressUrl)
    /// when no base URL is configured.
    pub fn new(
        options: WordPressOptions,
        verify: impl Verify<WordPressProfile> + 'static,
    ) -> WordPressResult<Self> {
        Self::with_state_store(options, verify, Arc::new(InMemoryStateStore::new()))
    }

    pub fn with_state_store(
        options: WordPressOptions,
        verify: impl Verify<WordPressProfile> + 'static,
        state_store: Arc<dyn OAuth2StateStore>,
    ) -> WordPressResult<Self> {
        let endpoints = options.endpoints()?;

        let client = OAuth2Client::new(
            options.provider_config(STRATEGY_NAME, &endpoints),
            state_store,
            &options.client_settings(),
        )?;

        debug!(
            authorization_url = %endpoints.authorization_url,
            token_url = %endpoints.token_url,
            profile_url = %endpoints.profile_url,
            "Configured WordPress strategy"
        );

        Ok(Self {
            client,
            profile_url: endpoints.profile_url,
            verify: Arc::new(verify),
        })
    }

    pub fn profile_url(&self) -> &str {
        &self.profile_url
    }

    /// GET `url` with the access token in the query string only.
    ///
    /// WordPress OAuth Server expects a single token transport per request,
    /// so the client is configured with `AccessTokenTransport::Query` and no
    /// `Authorization` header is ever sent.
    pub async fn get(&self, url: &str, access_token: &str) -> OAuth2Result<HttpResponse> {
        self.client.get(url, access_token).await
    }

    /// Fetch and normalize the profile of the user owning `access_token`
    pub async fn user_profile(&self, access_token: &str) -> WordPressResult<WordPressProfile> {
        let response = self.get(&self.profile_url, access_token).await?;
        let profile = WordPressProfile::parse(response.body)?;

        info!("Loaded WordPress profile for user {}", profile.id());
        Ok(profile)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> OAuth2Result<TokenResponse> {
        self.client.refresh_token(refresh_token).await
    }
}

#[async_trait]
impl OAuth2Strategy for WordPressStrategy {
    type Profile = WordPressProfile;
    type Error = crate::WordPressError;

    fn name(&self) -> &str {
        STRATEGY_NAME
    }

    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    fn verifier(&self) -> &dyn Verify<WordPressProfile> {
        self.verify.as_ref()
    }

    async fn user_profile(&self, access_token: &str) -> WordPressResult<WordPressProfile> {
        WordPressStrategy::user_profile(self, access_token).await
    }
}

#[async_trait]
impl IdentityProvider for WordPressStrategy {
    fn provider_id(&self) -> &str {
        STRATEGY_NAME
    }

    async fn verify(&self, auth_payload: serde_json::Value) -> IdentityResult<VerifiedIdentity> {
        self.verify_payload(auth_payload).await
    }
}
