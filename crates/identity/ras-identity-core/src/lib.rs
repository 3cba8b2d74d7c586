//! Core identity provider traits and types.
//!
//! A host application registers [`IdentityProvider`]s under their
//! [`IdentityProvider::provider_id`] and hands each one an opaque JSON payload
//! taken from the incoming request. Providers answer with a
//! [`VerifiedIdentity`] or an [`IdentityError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The verifier rejected the user (the `false` outcome of a verify callback).
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid authentication payload")]
    InvalidPayload,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity resolved by a provider and accepted by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub provider_id: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Name the host uses to route authentication requests to this provider.
    fn provider_id(&self) -> &str;

    async fn verify(&self, auth_payload: serde_json::Value) -> IdentityResult<VerifiedIdentity>;
}
