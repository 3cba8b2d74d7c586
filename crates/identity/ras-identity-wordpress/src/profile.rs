//! WordPress profile decoding and normalization.

use crate::error::{WordPressError, WordPressResult};
use crate::strategy::STRATEGY_NAME;
use ras_identity_oauth2::VerifiedIdentity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Provider tag carried by every normalized profile
pub const PROVIDER_TAG: &str = "WordPress-OAuth-Server";

/// WordPress user ID. The server sends it as a number or as a numeric string
/// depending on the plugin version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{}", id),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// Body of the `/oauth/me/` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProfile {
    #[serde(rename = "ID")]
    pub id: UserId,
    pub display_name: String,
    pub user_email: String,
    #[serde(default)]
    pub user_login: Option<String>,
    #[serde(default)]
    pub user_nicename: Option<String>,
    #[serde(default)]
    pub user_url: Option<String>,
    #[serde(default)]
    pub user_registered: Option<String>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileEmail {
    pub value: String,
}

/// Normalized profile handed to the verify callback.
///
/// Serializes with the conventional field names (`provider`, `id`,
/// `displayName`, `emails`, `_raw`, `_json`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordPressProfile {
    provider: &'static str,
    id: UserId,
    #[serde(rename = "displayName")]
    display_name: String,
    emails: Vec<ProfileEmail>,
    #[serde(rename = "_raw")]
    raw: String,
    #[serde(rename = "_json")]
    json: Value,
}

impl WordPressProfile {
    /// Decode a profile response body
    pub fn parse(body: String) -> WordPressResult<Self> {
        let json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(source) => return Err(WordPressError::Parse { source, body }),
        };

        let raw_profile = match RawProfile::deserialize(&json) {
            Ok(raw_profile) => raw_profile,
            Err(source) => return Err(WordPressError::Parse { source, body }),
        };

        Ok(Self {
            provider: PROVIDER_TAG,
            id: raw_profile.id,
            display_name: raw_profile.display_name,
            emails: vec![ProfileEmail {
                value: raw_profile.user_email,
            }],
            raw: body,
            json,
        })
    }

    pub fn provider(&self) -> &str {
        self.provider
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn emails(&self) -> &[ProfileEmail] {
        &self.emails
    }

    pub fn email(&self) -> Option<&str> {
        self.emails.first().map(|email| email.value.as_str())
    }

    /// Response body exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn json(&self) -> &Value {
        &self.json
    }
}

impl From<WordPressProfile> for VerifiedIdentity {
    fn from(profile: WordPressProfile) -> Self {
        let email = profile.email().map(String::from);

        VerifiedIdentity {
            provider_id: STRATEGY_NAME.to_string(),
            subject: profile.id.to_string(),
            email,
            display_name: Some(profile.display_name),
            metadata: Some(profile.json),
        }
    }
}
