//! REST API client module for the remote authentication endpoint.
//!
//! The endpoint trades an e-mail and password for a session payload
//! carrying the user's identity and a bearer token. `Authenticator` is the
//! seam the `AuthContext` talks through; `ApiClient` is its HTTP rendition.

pub mod client;
pub mod error;

use std::future::Future;

pub use client::ApiClient;
pub use error::ApiError;

use crate::auth::Session;

/// Anything that can exchange credentials for a session.
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;
}
