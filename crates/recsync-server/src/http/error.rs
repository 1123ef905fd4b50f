//! Mapping of engine errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use recsync_core::Error;
use recsync_core::error::InvalidInputError;

/// An engine error rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<InvalidInputError> for ApiError {
    fn from(err: InvalidInputError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(
            InvalidInputError::Other {
                message: rejection.body_text(),
            }
            .into(),
        )
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();

        if status.is_server_error() {
            error!(error = %message, "Request failed");
        } else {
            warn!(%status, error = %message, "Request rejected");
        }

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recsync_core::error::{AuthError, StoreError, UpstreamError};

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (AuthError::MissingCredential.into(), StatusCode::UNAUTHORIZED),
            (InvalidInputError::missing("action").into(), StatusCode::BAD_REQUEST),
            (Error::not_found("T1/42"), StatusCode::NOT_FOUND),
            (UpstreamError::Timeout.into(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                StoreError::Io {
                    message: "disk full".to_string(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
