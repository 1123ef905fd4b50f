//! Per-customer access tokens for the external API.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use recsync_core::Result;
use recsync_core::error::{AuthError, Error};
use recsync_core::types::CustomerId;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    iss: &'a str,
    iat: i64,
    exp: i64,
}

/// Signs short-lived HS256 tokens that act on behalf of one customer.
#[derive(Clone)]
pub struct TokenIssuer {
    workspace_key: String,
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Default token lifetime.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    pub fn new(workspace_key: impl Into<String>, workspace_secret: &str) -> Self {
        Self {
            workspace_key: workspace_key.into(),
            key: EncodingKey::from_secret(workspace_secret.as_bytes()),
            ttl: Self::DEFAULT_TTL,
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a token for a customer.
    pub fn issue(&self, customer_id: &CustomerId, name: Option<&str>) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: customer_id.as_str(),
            name,
            iss: &self.workspace_key,
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| {
            Error::from(AuthError::InvalidToken {
                reason: e.to_string(),
            })
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("workspace_key", &self.workspace_key)
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}
