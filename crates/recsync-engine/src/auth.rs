//! Tenant resolution from signed tokens and payload-carried ids.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use recsync_core::error::AuthError;
use recsync_core::{CustomerId, Error, Result};

#[derive(Debug, Deserialize)]
struct TenantClaims {
    #[serde(default)]
    id: Option<Value>,
}

/// Resolves the customer a request acts for.
///
/// With a secret, tokens must carry a valid HS256 signature and an
/// unexpired `exp`. Without one, the token payload is read unverified.
#[derive(Clone)]
pub struct TenantResolver {
    key: DecodingKey,
    validation: Validation,
    verifies: bool,
}

impl TenantResolver {
    pub fn new(secret: Option<&str>) -> Self {
        match secret {
            Some(secret) => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_aud = false;
                Self {
                    key: DecodingKey::from_secret(secret.as_bytes()),
                    validation,
                    verifies: true,
                }
            }
            None => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims.clear();
                Self {
                    key: DecodingKey::from_secret(&[]),
                    validation,
                    verifies: false,
                }
            }
        }
    }

    /// Whether tokens are signature-checked.
    pub fn verifies(&self) -> bool {
        self.verifies
    }

    /// Read the customer id from a token's `id` claim.
    pub fn customer_from_token(&self, token: &str) -> Result<CustomerId> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        let data = decode::<TenantClaims>(token, &self.key, &self.validation).map_err(|e| {
            AuthError::InvalidToken {
                reason: e.to_string(),
            }
        })?;

        let id = match data.claims.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(AuthError::InvalidToken {
                    reason: "token has no 'id' claim".to_string(),
                }
                .into());
            }
        };

        CustomerId::new(id).map_err(|e| {
            Error::from(AuthError::InvalidToken {
                reason: e.to_string(),
            })
        })
    }

    /// Resolve the tenant from an optional token and an optional
    /// payload-carried customer id.
    ///
    /// Either source alone is enough. When both are present they must
    /// name the same customer.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when neither source is present, the token is invalid,
    /// or the two sources disagree.
    pub fn resolve(&self, token: Option<&str>, payload_customer: Option<&str>) -> Result<CustomerId> {
        let from_token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Some(self.customer_from_token(token)?),
            None => None,
        };

        let from_payload = match payload_customer.map(str::trim).filter(|c| !c.is_empty()) {
            Some(id) => Some(CustomerId::new(id)?),
            None => None,
        };

        match (from_token, from_payload) {
            (Some(token), Some(payload)) if token != payload => Err(AuthError::TenantMismatch {
                token: token.to_string(),
                payload: payload.to_string(),
            }
            .into()),
            (Some(customer), _) | (None, Some(customer)) => {
                debug!(customer = %customer, "Resolved tenant");
                Ok(customer)
            }
            (None, None) => Err(AuthError::MissingCredential.into()),
        }
    }
}

impl std::fmt::Debug for TenantResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolver")
            .field("verifies", &self.verifies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn token(claims: Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn unverified_mode_reads_any_signature() {
        let resolver = TenantResolver::new(None);
        let t = token(json!({"id": "T1", "iss": "ws"}), "whatever");
        assert_eq!(resolver.resolve(Some(&t), None).unwrap().as_str(), "T1");
    }

    #[test]
    fn verified_mode_rejects_wrong_secret() {
        let resolver = TenantResolver::new(Some("right"));

        let good = token(json!({"id": "T1", "exp": far_future()}), "right");
        assert_eq!(resolver.customer_from_token(&good).unwrap().as_str(), "T1");

        let bad = token(json!({"id": "T1", "exp": far_future()}), "wrong");
        assert!(matches!(
            resolver.customer_from_token(&bad),
            Err(Error::Unauthorized(AuthError::InvalidToken { .. }))
        ));
    }

    #[test]
    fn numeric_id_claims_are_accepted() {
        let resolver = TenantResolver::new(None);
        let t = token(json!({"id": 1234}), "s");
        assert_eq!(resolver.customer_from_token(&t).unwrap().as_str(), "1234");
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let resolver = TenantResolver::new(None);
        let t = format!("Bearer {}", token(json!({"id": "T1"}), "s"));
        assert_eq!(resolver.customer_from_token(&t).unwrap().as_str(), "T1");
    }

    #[test]
    fn token_without_id_is_invalid() {
        let resolver = TenantResolver::new(None);
        let t = token(json!({"sub": "T1"}), "s");
        assert!(matches!(
            resolver.resolve(Some(&t), None),
            Err(Error::Unauthorized(AuthError::InvalidToken { .. }))
        ));
        assert!(resolver.resolve(Some("not-a-jwt"), None).is_err());
    }

    #[test]
    fn payload_only_and_matching_sources() {
        let resolver = TenantResolver::new(None);
        assert_eq!(resolver.resolve(None, Some("T2")).unwrap().as_str(), "T2");

        let t = token(json!({"id": "T2"}), "s");
        assert_eq!(
            resolver.resolve(Some(&t), Some("T2")).unwrap().as_str(),
            "T2"
        );
    }

    #[test]
    fn disagreeing_sources_are_rejected() {
        let resolver = TenantResolver::new(None);
        let t = token(json!({"id": "T1"}), "s");
        assert!(matches!(
            resolver.resolve(Some(&t), Some("T2")),
            Err(Error::Unauthorized(AuthError::TenantMismatch { .. }))
        ));
    }

    #[test]
    fn nothing_is_missing_credential() {
        let resolver = TenantResolver::new(None);
        assert!(matches!(
            resolver.resolve(None, Some("  ")),
            Err(Error::Unauthorized(AuthError::MissingCredential))
        ));
    }
}
