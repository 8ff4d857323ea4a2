//! Composition root for the auth and notification services.
//!
//! Front ends build one `AppServices` at startup and pass references to it
//! wherever the current user or the toast queue is needed. Construction
//! restores the persisted session first, so the value is ready to render.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ApiClient, Authenticator};
use crate::auth::{AuthContext, FileSessionStore};
use crate::config::Config;
use crate::notifications::NotificationCenter;

pub struct AppServices<A = ApiClient> {
    pub auth: Arc<AuthContext<A>>,
    pub toasts: NotificationCenter,
}

impl<A> Clone for AppServices<A> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            toasts: self.toasts.clone(),
        }
    }
}

impl AppServices<ApiClient> {
    /// Wire the HTTP client, on-disk session and toast queue from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = ApiClient::new(&config.api_base_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let data_dir = config.data_dir()?;
        debug!(?data_dir, api = %config.api_base_url, "Composing services");

        let auth = AuthContext::restore(api, Box::new(FileSessionStore::new(data_dir)))
            .with_request_timeout(config.request_timeout());
        let toasts = NotificationCenter::new(config.toast_duration());

        Ok(Self::new(auth, toasts))
    }
}

impl<A: Authenticator> AppServices<A> {
    pub fn new(auth: AuthContext<A>, toasts: NotificationCenter) -> Self {
        Self {
            auth: Arc::new(auth),
            toasts,
        }
    }
}
