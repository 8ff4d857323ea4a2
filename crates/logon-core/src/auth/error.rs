use thiserror::Error;

use super::FieldError;
use crate::api::ApiError;

/// Why a sign-in was rejected.
///
/// Every variant leaves the `AuthContext` signed out. None are retried.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid input: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AuthError {
    pub fn is_network(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            // A body that could not be decoded is a bad answer, not a bad link
            ApiError::NetworkError(e) if e.is_decode() => {
                AuthError::AuthenticationFailed(e.to_string())
            }
            ApiError::NetworkError(e) => AuthError::Network(e.to_string()),
            other => AuthError::AuthenticationFailed(other.to_string()),
        }
    }
}
