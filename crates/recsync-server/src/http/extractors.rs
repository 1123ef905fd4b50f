//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use recsync_core::CustomerId;
use recsync_core::error::AuthError;

use super::{ApiError, AppState};

/// The customer named by the `Authorization: Bearer <jwt>` header.
pub struct Customer(pub CustomerId);

impl FromRequestParts<AppState> for Customer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredential)
            .map_err(|e| ApiError(e.into()))?;

        let value = header.to_str().map_err(|_| {
            ApiError(
                AuthError::InvalidToken {
                    reason: "authorization header is not valid text".to_string(),
                }
                .into(),
            )
        })?;

        let customer = state.tenants().resolve(Some(value), None)?;
        Ok(Customer(customer))
    }
}
