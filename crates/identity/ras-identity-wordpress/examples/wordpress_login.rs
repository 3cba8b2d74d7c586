//! Minimal login server authenticating against a WordPress OAuth Server.
//!
//! Configure through `WORDPRESS_*` variables (a `.env` file works too):
//!
//! ```text
//! WORDPRESS_URL=https://your-wp.com
//! WORDPRESS_CLIENT_ID=...
//! WORDPRESS_CLIENT_SECRET=...
//! WORDPRESS_CALLBACK_URL=http://localhost:3000/auth/wordpress/callback
//! ```
//!
//! Then open `http://localhost:3000/auth/wordpress`.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
};
use ras_identity_wordpress::{
    IdentityError, IdentityProvider, IdentityResult, OAuth2Response, OAuth2Strategy, TokenResponse,
    VerifiedIdentity, WordPressOptions, WordPressProfile, WordPressStrategy,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: String,
    error: Option<String>,
    error_description: Option<String>,
}

/// Stand-in for the application's user lookup
async fn find_or_create_user(
    tokens: TokenResponse,
    profile: WordPressProfile,
) -> IdentityResult<Option<VerifiedIdentity>> {
    info!(
        user_id = %profile.id(),
        has_refresh_token = tokens.refresh_token.is_some(),
        "WordPress user signed in"
    );
    Ok(Some(profile.into()))
}

async fn start_handler(
    State(strategy): State<Arc<WordPressStrategy>>,
) -> Result<Redirect, (StatusCode, String)> {
    let OAuth2Response::AuthorizationUrl { url, .. } = strategy
        .start(HashMap::new())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Redirect::to(&url))
}

async fn callback_handler(
    State(strategy): State<Arc<WordPressStrategy>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<VerifiedIdentity>, (StatusCode, String)> {
    let payload = serde_json::json!({
        "type": "Callback",
        "provider_id": strategy.provider_id(),
        "code": query.code,
        "state": query.state,
        "error": query.error,
        "error_description": query.error_description,
    });

    match strategy.verify(payload).await {
        Ok(identity) => Ok(Json(identity)),
        Err(IdentityError::InvalidCredentials) => {
            warn!("WordPress login rejected");
            Err((StatusCode::FORBIDDEN, "Access denied".to_string()))
        }
        Err(e) => {
            error!("WordPress login failed: {}", e);
            Err((StatusCode::BAD_GATEWAY, "Login failed".to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = WordPressOptions::from_env().context("Invalid WordPress configuration")?;
    let strategy = Arc::new(
        WordPressStrategy::new(options, find_or_create_user)
            .context("Failed to configure WordPress strategy")?,
    );
    info!("Profile endpoint: {}", strategy.profile_url());

    let app = Router::new()
        .route("/auth/wordpress", get(start_handler))
        .route("/auth/wordpress/callback", get(callback_handler))
        .with_state(strategy);

    let bind_addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
