//! Authentication module for managing the signed-in session.
//!
//! This module provides:
//! - `Session`: the authenticated identity and its bearer token
//! - `SessionStore`: persistence of a single session across restarts
//!   (`FileSessionStore` on disk, `MemorySessionStore` in process)
//! - `AuthContext`: sign-in/sign-out orchestration and the current user
//! - `CredentialInput`: field-level validation for sign-in forms
//!
//! Sessions never expire on their own; they live until sign-out.

pub mod context;
pub mod credentials;
pub mod error;
pub mod session;

pub use context::{AuthContext, AuthState};
pub use credentials::{CredentialInput, Field, FieldError};
pub use error::AuthError;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore, StoreError};
