//! API client for the remote authentication endpoint.
//!
//! This module provides the `ApiClient` struct, which posts credentials to
//! the sessions endpoint and turns the answer into a `Session`.

use std::time::Duration;

use reqwest::{header, Client};
use serde::Serialize;
use tracing::debug;

use super::{ApiError, Authenticator};
use crate::auth::Session;

// ============================================================================
// Constants
// ============================================================================

/// Path of the credential exchange endpoint, relative to the base URL
const SESSIONS_PATH: &str = "sessions";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct SessionRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// API client for the authentication service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a session
    pub async fn create_session(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let url = format!("{}/{}", self.base_url, SESSIONS_PATH);
        debug!(url = %url, "Requesting session");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&SessionRequest { email, password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body = response.text().await?;

        let session: Session = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse session: {}", e)))?;
        if !session.is_complete() {
            return Err(ApiError::InvalidResponse(
                "Session payload is missing its user id or token".to_string(),
            ));
        }

        Ok(session)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

impl Authenticator for ApiClient {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        self.create_session(email, password).await
    }
}
