//! WordPress strategy error types.

use ras_identity_oauth2::OAuth2Error;
use thiserror::Error;

pub type WordPressResult<T> = Result<T, WordPressError>;

#[derive(Debug, Error)]
pub enum WordPressError {
    #[error("WordPress OAuth Server strategy requires a wordpress_url option")]
    MissingWordPressUrl,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid {endpoint} endpoint: {source}")]
    InvalidEndpoint {
        endpoint: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// Failure reported by the OAuth2 client, passed through untouched
    #[error(transparent)]
    Transport(#[from] OAuth2Error),

    /// The profile response was not a WordPress profile. `body` holds the
    /// response text; it is kept out of `Display` since it may carry
    /// personal data.
    #[error("Failed to parse WordPress profile: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}
