//! Core library for logon.
//!
//! This crate holds everything a sign-in front end needs that is not
//! presentation:
//! - `auth`: the session record, its persistent store and the `AuthContext`
//!   that owns "who is signed in"
//! - `api`: the HTTP client for the remote credential exchange
//! - `notifications`: the toast queue with independent auto-expiry
//! - `config`: application configuration and data directory resolution
//! - `services`: composition of the above in their initialization order

pub mod api;
pub mod auth;
pub mod config;
pub mod notifications;
pub mod services;

pub use api::{ApiClient, ApiError, Authenticator};
pub use auth::{
    AuthContext, AuthError, AuthState, CredentialInput, Field, FieldError, FileSessionStore,
    MemorySessionStore, Session, SessionStore, StoreError,
};
pub use config::Config;
pub use notifications::{Notification, NotificationCenter, ToastId, ToastKind};
pub use services::AppServices;
