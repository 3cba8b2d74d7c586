//! WordPress OAuth Server identity provider.
//!
//! Authenticates users against a WordPress site running the WP OAuth Server
//! plugin. Endpoints are derived from the site's base URL:
//!
//! | Endpoint      | Path                 |
//! |---------------|----------------------|
//! | authorization | `/oauth/authorize/`  |
//! | token         | `/oauth/token/`      |
//! | profile       | `/oauth/me/`         |
//!
//! The OAuth2 flow is handled by [`ras_identity_oauth2::OAuth2Client`]. This
//! crate fetches the profile (access token in the query string only, never in
//! an `Authorization` header), normalizes it into a [`WordPressProfile`] and
//! passes it to the application's [`Verify`] callback.
//!
//! ```no_run
//! use ras_identity_wordpress::{
//!     IdentityResult, TokenResponse, VerifiedIdentity, WordPressOptions, WordPressProfile,
//!     WordPressStrategy,
//! };
//!
//! async fn find_user(
//!     _tokens: TokenResponse,
//!     profile: WordPressProfile,
//! ) -> IdentityResult<Option<VerifiedIdentity>> {
//!     Ok(Some(profile.into()))
//! }
//!
//! let options = WordPressOptions::builder()
//!     .wordpress_url("http://your-wp.com")
//!     .client_id("123-456-789")
//!     .client_secret("shhh-its-a-secret")
//!     .callback_url("https://www.example.net/auth/wordpress/callback")
//!     .build();
//!
//! let strategy = WordPressStrategy::new(options, find_user)?;
//! # Ok::<(), ras_identity_wordpress::WordPressError>(())
//! ```

mod error;
mod options;
mod profile;
mod strategy;

#[cfg(test)]
mod tests;

pub use error::{WordPressError, WordPressResult};
pub use options::{AUTHORIZE_PATH, PROFILE_PATH, TOKEN_PATH, WordPressEndpoints, WordPressOptions};
pub use profile::{PROVIDER_TAG, ProfileEmail, RawProfile, UserId, WordPressProfile};
pub use strategy::{STRATEGY_NAME, WordPressStrategy};

// Re-export common types for convenience
pub use ras_identity_oauth2::{
    IdentityError, IdentityProvider, IdentityResult, OAuth2Response, OAuth2Strategy,
    TokenResponse, VerifiedIdentity, Verify,
};
