//! HTTP client for the external API.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};
use url::Url;

use recsync_core::Result;
use recsync_core::error::{AuthError, Error, HttpStatusError, UpstreamError};

use crate::endpoints::ApiErrorResponse;

/// Map a reqwest failure into the upstream taxonomy.
pub(crate) fn map_reqwest(err: reqwest::Error) -> Error {
    let upstream = if err.is_timeout() {
        UpstreamError::Timeout
    } else if err.is_decode() {
        UpstreamError::Malformed {
            message: err.to_string(),
        }
    } else {
        UpstreamError::Connection {
            message: err.to_string(),
        }
    };
    Error::Upstream(upstream)
}

/// JSON-over-HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(map_reqwest)?;

        Ok(Self { client, base })
    }

    /// Returns the base URL this client is configured for.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The underlying reqwest client, for calls outside the base URL.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build a URL by appending percent-encoded path segments to the base.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::NotConfigured {
                target: self.base.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make an authenticated GET request.
    #[instrument(skip(self, token), fields(base = %self.base))]
    pub async fn get_authed<R>(&self, segments: &[&str], token: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(segments)?;
        debug!(%url, "API query");

        let response = self
            .client
            .get(url)
            .headers(auth_headers(token)?)
            .send()
            .await
            .map_err(map_reqwest)?;

        handle_response(response).await
    }

    /// Make an authenticated POST request with a JSON body.
    #[instrument(skip(self, body, token), fields(base = %self.base))]
    pub async fn post_authed<B, R>(&self, segments: &[&str], body: &B, token: &str) -> Result<R>
    where
        B: Serialize + std::fmt::Debug,
        R: DeserializeOwned,
    {
        let url = self.url(segments)?;
        debug!(%url, "API procedure");
        trace!(?body, "request body");

        let response = self
            .client
            .post(url)
            .json(body)
            .headers(auth_headers(token)?)
            .send()
            .await
            .map_err(map_reqwest)?;

        handle_response(response).await
    }
}

/// Create authorization headers for authenticated requests.
fn auth_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let auth_value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        AuthError::InvalidToken {
            reason: "token contains invalid header characters".to_string(),
        }
    })?;
    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Handle a response, parsing the body or the error.
pub(crate) async fn handle_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let status = response.status();
    trace!(status = %status, "API response");

    if status.is_success() {
        let body = response.json::<R>().await.map_err(|e| {
            Error::Upstream(UpstreamError::Malformed {
                message: e.to_string(),
            })
        })?;
        Ok(body)
    } else {
        Err(parse_error_response(response).await.into())
    }
}

/// Turn a non-success response into an HTTP status error.
pub(crate) async fn parse_error_response(response: reqwest::Response) -> HttpStatusError {
    let status = response.status().as_u16();

    let text = match response.text().await {
        Ok(text) => text,
        Err(_) => return HttpStatusError::new(status, None),
    };

    let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
        Ok(body) => body.message.or(body.error),
        Err(_) if text.trim().is_empty() => None,
        Err(_) => Some(text),
    };

    HttpStatusError::new(status, message)
}
