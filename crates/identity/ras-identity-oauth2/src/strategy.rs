//! Provider strategies layered over [`OAuth2Client`].
//!
//! A provider crate wraps a configured client, knows how to turn an access
//! token into its own profile type, and carries the application's [`Verify`]
//! callback. [`OAuth2Strategy`] supplies the rest of the flow on top of that.

use crate::client::OAuth2Client;
use crate::error::OAuth2Result;
use crate::types::{AuthorizationResponse, TokenResponse};
use async_trait::async_trait;
use ras_identity_core::{IdentityError, IdentityResult, VerifiedIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use tracing::{info, warn};

/// Payload accepted by [`OAuth2Strategy::verify_payload`]
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OAuth2AuthPayload {
    /// Start the OAuth2 flow - returns authorization URL
    StartFlow {
        provider_id: String,
        additional_params: Option<HashMap<String, String>>,
    },
    /// Complete the OAuth2 flow with callback data
    Callback {
        provider_id: String,
        code: Option<String>,
        state: String,
        error: Option<String>,
        error_description: Option<String>,
    },
}

/// Answer to a [`OAuth2AuthPayload::StartFlow`]
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OAuth2Response {
    /// Authorization URL to redirect the user to
    AuthorizationUrl { url: String, state: String },
}

/// Application callback deciding whether a provider profile maps to a user.
///
/// `Ok(None)` rejects the user; errors abort authentication.
#[async_trait]
pub trait Verify<P>: Send + Sync {
    async fn verify(
        &self,
        tokens: TokenResponse,
        profile: P,
    ) -> IdentityResult<Option<VerifiedIdentity>>;
}

#[async_trait]
impl<P, F, Fut> Verify<P> for F
where
    P: Send + 'static,
    F: Fn(TokenResponse, P) -> Fut + Send + Sync,
    Fut: Future<Output = IdentityResult<Option<VerifiedIdentity>>> + Send + 'static,
{
    async fn verify(
        &self,
        tokens: TokenResponse,
        profile: P,
    ) -> IdentityResult<Option<VerifiedIdentity>> {
        (self)(tokens, profile).await
    }
}

#[async_trait]
pub trait OAuth2Strategy: Send + Sync {
    type Profile: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name the host uses to route requests to this strategy
    fn name(&self) -> &str;

    fn client(&self) -> &OAuth2Client;

    fn verifier(&self) -> &dyn Verify<Self::Profile>;

    async fn user_profile(&self, access_token: &str) -> Result<Self::Profile, Self::Error>;

    async fn start(
        &self,
        additional_params: HashMap<String, String>,
    ) -> OAuth2Result<OAuth2Response> {
        let (url, state) = self.client().authorization_url(additional_params).await?;
        info!("Started OAuth2 flow for provider: {}", self.name());
        Ok(OAuth2Response::AuthorizationUrl { url, state })
    }

    /// Exchange the callback code, load the profile and hand both to the verifier
    async fn authenticate(
        &self,
        callback: AuthorizationResponse,
    ) -> IdentityResult<VerifiedIdentity> {
        let tokens = self
            .client()
            .handle_callback(callback)
            .await
            .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

        let profile = self
            .user_profile(&tokens.access_token)
            .await
            .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

        match self.verifier().verify(tokens, profile).await? {
            Some(identity) => {
                info!(
                    "Successfully verified identity for provider: {}",
                    self.name()
                );
                Ok(identity)
            }
            None => {
                warn!("Verifier rejected user for provider: {}", self.name());
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    /// Entry point for [`IdentityProvider::verify`](ras_identity_core::IdentityProvider::verify).
    ///
    /// `StartFlow` never succeeds: the authorization URL comes back as a
    /// serialized [`OAuth2Response`] inside [`IdentityError::ProviderError`].
    async fn verify_payload(
        &self,
        auth_payload: serde_json::Value,
    ) -> IdentityResult<VerifiedIdentity> {
        let payload: OAuth2AuthPayload =
            serde_json::from_value(auth_payload).map_err(|_| IdentityError::InvalidPayload)?;

        match payload {
            OAuth2AuthPayload::StartFlow {
                provider_id,
                additional_params,
            } => {
                self.check_provider(&provider_id)?;

                let response = self
                    .start(additional_params.unwrap_or_default())
                    .await
                    .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

                Err(IdentityError::ProviderError(serde_json::to_string(
                    &response,
                )?))
            }
            OAuth2AuthPayload::Callback {
                provider_id,
                code,
                state,
                error,
                error_description,
            } => {
                self.check_provider(&provider_id)?;

                self.authenticate(AuthorizationResponse {
                    code,
                    state,
                    error,
                    error_description,
                })
                .await
            }
        }
    }

    fn check_provider(&self, provider_id: &str) -> IdentityResult<()> {
        if provider_id != self.name() {
            return Err(IdentityError::ProviderError(format!(
                "Provider mismatch: expected {}, got {}",
                self.name(),
                provider_id
            )));
        }
        Ok(())
    }
}
