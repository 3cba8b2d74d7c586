//! OAuth2 state management for CSRF protection.

use crate::error::{OAuth2Error, OAuth2Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Pending authorization, keyed by the `state` parameter sent to the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2State {
    pub state: String,
    pub provider_id: String,
    pub redirect_uri: String,
    pub code_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2State {
    pub fn new(
        provider_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        code_verifier: Option<String>,
        ttl_seconds: u64,
    ) -> Self {
        let created_at = Utc::now();
        let ttl = Duration::seconds(ttl_seconds as i64);

        Self {
            state: Uuid::new_v4().to_string(),
            provider_id: provider_id.into(),
            redirect_uri: redirect_uri.into(),
            code_verifier,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for pending authorizations
#[async_trait]
pub trait OAuth2StateStore: Send + Sync {
    async fn store(&self, state: OAuth2State) -> OAuth2Result<()>;

    /// Remove and return a state. Expired entries are reported as missing.
    async fn retrieve(&self, state: &str) -> OAuth2Result<OAuth2State>;

    async fn cleanup_expired(&self) -> OAuth2Result<usize>;
}

#[derive(Default)]
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<String, OAuth2State>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuth2StateStore for InMemoryStateStore {
    async fn store(&self, state: OAuth2State) -> OAuth2Result<()> {
        let mut states = self.states.write().await;
        // Abandoned flows never reach retrieve
        states.retain(|_, pending| !pending.is_expired());
        states.insert(state.state.clone(), state);
        Ok(())
    }

    async fn retrieve(&self, state: &str) -> OAuth2Result<OAuth2State> {
        let oauth_state = self
            .states
            .write()
            .await
            .remove(state)
            .ok_or(OAuth2Error::StateNotFound)?;

        if oauth_state.is_expired() {
            return Err(OAuth2Error::StateNotFound);
        }

        Ok(oauth_state)
    }

    async fn cleanup_expired(&self) -> OAuth2Result<usize> {
        let mut states = self.states.write().await;
        let before = states.len();
        let now = Utc::now();
        states.retain(|_, state| state.expires_at >= now);
        Ok(before - states.len())
    }
}
