//! Generic OAuth2 client with PKCE support.
//!
//! This crate implements the Authorization Code flow (state handling, code
//! exchange, token refresh) and the protected-resource request helpers that
//! provider crates build on. Provider crates implement [`OAuth2Strategy`] to
//! add their profile endpoint and mapping.

mod client;
mod config;
mod error;
mod state;
mod strategy;
mod types;


pub use client::{OAuth2Client, PkceChallenge};
pub use config::{AccessTokenTransport, OAuth2Config, OAuth2ProviderConfig};
pub use error::{OAuth2Error, OAuth2Result};
pub use state::{InMemoryStateStore, OAuth2State, OAuth2StateStore};
pub use strategy::{OAuth2AuthPayload, OAuth2Response, OAuth2Strategy, Verify};
pub use types::{AuthorizationResponse, HttpResponse, TokenResponse};

// Re-export common types for convenience
pub use ras_identity_core::{IdentityError, IdentityProvider, IdentityResult, VerifiedIdentity};
pub use reqwest::Method;
pub use reqwest::header::HeaderMap;
