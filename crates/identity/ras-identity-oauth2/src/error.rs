//! OAuth2 error types.

use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-2xx answer from a provider endpoint. Redirects land here too since
    /// the client never follows them.
    #[error("Request failed with status {status}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("State not found or expired")]
    StateNotFound,

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Callback error: {0}")]
    CallbackError(String),
}
