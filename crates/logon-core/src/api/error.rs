use thiserror::Error;

/// How a credential exchange went wrong on the wire.
///
/// The sessions endpoint only tells three outcomes apart: the credentials
/// were refused (401), the request was otherwise refused (other 4xx), or
/// the service broke (5xx). Everything else is transport or payload.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - credentials were rejected")]
    Unauthorized,

    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let cut = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= MAX_ERROR_BODY_LENGTH)
            .last()
            .unwrap_or(0);
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        let code = status.as_u16();
        match code {
            401 => ApiError::Unauthorized,
            400..=499 => ApiError::Rejected { status: code, body },
            500..=599 => ApiError::ServerError { status: code, body },
            _ => ApiError::InvalidResponse(format!("Unexpected status {}: {}", status, body)),
        }
    }
}
