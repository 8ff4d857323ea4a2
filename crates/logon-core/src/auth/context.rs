//! The authority on who is signed in.
//!
//! `AuthContext` owns the in-memory session and is the only writer to the
//! `SessionStore`. Construction restores any persisted session before the
//! value is handed out, so observers never see an unresolved state.
//!
//! State changes are published on a `watch` channel in the order the
//! operations that caused them complete. Two overlapping `sign_in` calls
//! both run to completion and the one that finishes last decides the
//! final state. While any exchange is still in flight and nobody is signed
//! in, the published state is `Authenticating`, even if an earlier call has
//! already failed. `sign_out` always publishes `SignedOut`.
//!
//! Writing the store and publishing the new state happen under one lock,
//! so the persisted session and the in-memory one never disagree.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{AuthError, Session, SessionStore};
use crate::api::{client::DEFAULT_REQUEST_TIMEOUT_SECS, ApiClient, Authenticator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    /// A credential exchange is pending and nobody is signed in yet
    Authenticating,
    SignedIn(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

pub struct AuthContext<A = ApiClient> {
    authenticator: A,
    store: Box<dyn SessionStore>,
    state: watch::Sender<AuthState>,
    /// Number of exchanges in flight. Held across every store write and
    /// the matching state update.
    commit: Mutex<usize>,
    request_timeout: Duration,
}

/// Tracks one in-flight exchange. If the `sign_in` future is dropped
/// before it settles, the count is released and a dangling
/// `Authenticating` falls back to `SignedOut`.
struct PendingExchange<'a> {
    commit: &'a Mutex<usize>,
    state: &'a watch::Sender<AuthState>,
    settled: bool,
}

impl<'a> PendingExchange<'a> {
    fn start(commit: &'a Mutex<usize>, state: &'a watch::Sender<AuthState>) -> Self {
        let mut pending = lock(commit);
        *pending += 1;
        state.send_if_modified(|state| {
            if *state == AuthState::SignedOut {
                *state = AuthState::Authenticating;
                true
            } else {
                false
            }
        });
        Self {
            commit,
            state,
            settled: false,
        }
    }

    /// Release this exchange's slot. Returns how many others remain.
    fn settle(&mut self, pending: &mut usize) -> usize {
        self.settled = true;
        *pending = pending.saturating_sub(1);
        *pending
    }
}

impl Drop for PendingExchange<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut pending = lock(self.commit);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.state.send_if_modified(|state| {
                if *state == AuthState::Authenticating {
                    *state = AuthState::SignedOut;
                    true
                } else {
                    false
                }
            });
        }
    }
}

fn lock(commit: &Mutex<usize>) -> MutexGuard<'_, usize> {
    commit.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: Authenticator> AuthContext<A> {
    /// Build a context, resolving the initial state from `store`.
    ///
    /// A missing or unreadable record yields `SignedOut`; this never fails.
    pub fn restore(authenticator: A, store: Box<dyn SessionStore>) -> Self {
        let initial = match store.load() {
            Some(session) => {
                info!(user_id = %session.user_id, "Session restored");
                AuthState::SignedIn(session)
            }
            None => {
                debug!("No stored session");
                AuthState::SignedOut
            }
        };

        let (state, _) = watch::channel(initial);
        Self {
            authenticator,
            store,
            state,
            commit: Mutex::new(0),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Bound how long a credential exchange may take before it counts as
    /// a network failure.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Exchange credentials for a session and make it current.
    ///
    /// Inputs are assumed to be validated by the caller. On failure the
    /// context ends up signed out once no other exchange is pending, and no
    /// notification is raised; the returned error is the only signal.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        debug!(email = %email, "Signing in");
        let mut exchange_slot = PendingExchange::start(&self.commit, &self.state);

        let exchange = self.authenticator.authenticate(email, password);
        let outcome = match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Network(format!(
                "no response within {}ms",
                self.request_timeout.as_millis()
            ))),
        };

        let mut pending = lock(&self.commit);
        let others = exchange_slot.settle(&mut pending);

        match outcome {
            Ok(session) => {
                if let Err(e) = self.store.save(&session) {
                    warn!(error = %e, "Failed to save session");
                }
                info!(user_id = %session.user_id, "Sign-in successful");
                self.state.send_replace(AuthState::SignedIn(session));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, network = e.is_network(), "Sign-in failed");
                let next = if others > 0 {
                    AuthState::Authenticating
                } else {
                    AuthState::SignedOut
                };
                let previous = self.state.send_replace(next);
                // A session persisted by an earlier success must not outlive
                // the in-memory one
                if matches!(previous, AuthState::SignedIn(_)) {
                    self.clear_store();
                }
                Err(e)
            }
        }
    }

    /// Forget the current session, in memory and on disk.
    pub fn sign_out(&self) {
        let _pending = lock(&self.commit);
        self.clear_store();
        let previous = self.state.send_replace(AuthState::SignedOut);
        if let Some(session) = previous.session() {
            info!(user_id = %session.user_id, "Signed out");
        }
    }

    /// Snapshot of the signed-in session, if any.
    pub fn current_user(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), AuthState::SignedIn(_))
    }

    /// Bearer token of the current session
    pub fn token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    /// Observe state changes. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::api::ApiError;
    use crate::auth::MemorySessionStore;

    /// Endpoint that answers per e-mail after a fixed delay.
    #[derive(Default)]
    struct ScriptedEndpoint {
        replies: HashMap<String, (Duration, Result<Session, u16>)>,
    }

    impl ScriptedEndpoint {
        fn accept(mut self, email: &str, delay: Duration, session: Session) -> Self {
            self.replies
                .insert(email.to_string(), (delay, Ok(session)));
            self
        }

        fn reject(mut self, email: &str, delay: Duration, status: u16) -> Self {
            self.replies.insert(email.to_string(), (delay, Err(status)));
            self
        }
    }

    impl Authenticator for ScriptedEndpoint {
        async fn authenticate(&self, email: &str, _password: &str) -> Result<Session, ApiError> {
            let (delay, reply) = self
                .replies
                .get(email)
                .cloned()
                .unwrap_or((Duration::ZERO, Err(401)));
            tokio::time::sleep(delay).await;
            reply.map_err(|status| {
                ApiError::from_status(reqwest::StatusCode::from_u16(status).unwrap(), "")
            })
        }
    }

    /// Shares a memory store with the test so writes can be inspected.
    struct SharedStore(Arc<MemorySessionStore>);

    impl SessionStore for SharedStore {
        fn save(&self, session: &Session) -> Result<(), crate::auth::StoreError> {
            self.0.save(session)
        }
        fn read(&self) -> Result<Option<Session>, crate::auth::StoreError> {
            self.0.read()
        }
        fn clear(&self) -> Result<(), crate::auth::StoreError> {
            self.0.clear()
        }
    }

    /// Persists like the memory store, then stalls as a slow disk would.
    struct SlowSaveStore {
        inner: Arc<MemorySessionStore>,
        delay: Duration,
    }

    impl SessionStore for SlowSaveStore {
        fn save(&self, session: &Session) -> Result<(), crate::auth::StoreError> {
            self.inner.save(session)?;
            std::thread::sleep(self.delay);
            Ok(())
        }
        fn read(&self) -> Result<Option<Session>, crate::auth::StoreError> {
            self.inner.read()
        }
        fn clear(&self) -> Result<(), crate::auth::StoreError> {
            self.inner.clear()
        }
    }

    fn session(user_id: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            display_name: format!("User {}", user_id),
            email: format!("{}@example.com", user_id),
            token: format!("token-{}", user_id),
        }
    }

    fn context(endpoint: ScriptedEndpoint) -> (AuthContext<ScriptedEndpoint>, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let ctx = AuthContext::restore(endpoint, Box::new(SharedStore(Arc::clone(&store))));
        (ctx, store)
    }

    #[tokio::test]
    async fn test_sign_in_makes_session_current_and_persists_it() {
        let endpoint = ScriptedEndpoint::default().accept("1@example.com", Duration::ZERO, session("1"));
        let (ctx, store) = context(endpoint);

        ctx.sign_in("1@example.com", "pw").await.unwrap();

        assert_eq!(ctx.current_user(), Some(session("1")));
        assert_eq!(store.load(), Some(session("1")));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.token().as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_rejected_credentials_leave_signed_out() {
        let endpoint = ScriptedEndpoint::default().reject("a@b.com", Duration::ZERO, 401);
        let (ctx, store) = context(endpoint);

        let err = ctx.sign_in("a@b.com", "wrong").await.unwrap_err();

        assert!(matches!(err, AuthError::AuthenticationFailed(_)));
        assert_eq!(ctx.current_user(), None);
        assert_eq!(ctx.state(), AuthState::SignedOut);
        assert_eq!(store.raw(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_network_error_without_store_write() {
        let endpoint =
            ScriptedEndpoint::default().accept("slow@example.com", Duration::from_secs(60), session("slow"));
        let (ctx, store) = context(endpoint);
        let ctx = ctx.with_request_timeout(Duration::from_secs(5));

        let err = ctx.sign_in("slow@example.com", "pw").await.unwrap_err();

        assert!(err.is_network());
        assert_eq!(ctx.state(), AuthState::SignedOut);
        assert_eq!(store.raw(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticating_while_pending() {
        let endpoint =
            ScriptedEndpoint::default().accept("1@example.com", Duration::from_secs(1), session("1"));
        let (ctx, _store) = context(endpoint);
        let mut rx = ctx.subscribe();

        let (result, _) = tokio::join!(ctx.sign_in("1@example.com", "pw"), async {
            rx.changed().await.unwrap();
            assert_eq!(*rx.borrow_and_update(), AuthState::Authenticating);
        });
        result.unwrap();

        assert_eq!(ctx.state(), AuthState::SignedIn(session("1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_completed_sign_in_wins() {
        let endpoint = ScriptedEndpoint::default()
            .accept("slow@example.com", Duration::from_secs(3), session("slow"))
            .accept("fast@example.com", Duration::from_secs(1), session("fast"));
        let (ctx, store) = context(endpoint);

        let (slow, fast) = tokio::join!(
            ctx.sign_in("slow@example.com", "pw"),
            ctx.sign_in("fast@example.com", "pw"),
        );
        slow.unwrap();
        fast.unwrap();

        assert_eq!(ctx.current_user(), Some(session("slow")));
        assert_eq!(store.load(), Some(session("slow")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_failure_overrides_earlier_success() {
        let endpoint = ScriptedEndpoint::default()
            .accept("ok@example.com", Duration::from_secs(1), session("ok"))
            .reject("bad@example.com", Duration::from_secs(2), 401);
        let (ctx, store) = context(endpoint);

        let (ok, bad) = tokio::join!(
            ctx.sign_in("ok@example.com", "pw"),
            ctx.sign_in("bad@example.com", "pw"),
        );
        ok.unwrap();
        assert!(bad.is_err());

        assert_eq!(ctx.current_user(), None);
        assert_eq!(store.raw(), None);
    }

    #[tokio::test]
    async fn test_sign_out_always_clears() {
        let endpoint = ScriptedEndpoint::default().accept("1@example.com", Duration::ZERO, session("1"));
        let (ctx, store) = context(endpoint);

        ctx.sign_out();
        assert_eq!(ctx.current_user(), None);

        ctx.sign_in("1@example.com", "pw").await.unwrap();
        ctx.sign_out();
        assert_eq!(ctx.current_user(), None);
        assert_eq!(store.raw(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sign_out_during_save_keeps_store_and_memory_in_step() {
        let store = Arc::new(MemorySessionStore::new());
        let endpoint = ScriptedEndpoint::default().accept("1@example.com", Duration::ZERO, session("1"));
        let ctx = Arc::new(AuthContext::restore(
            endpoint,
            Box::new(SlowSaveStore {
                inner: Arc::clone(&store),
                delay: Duration::from_millis(300),
            }),
        ));

        let signing_in = tokio::spawn({
            let ctx = Arc::clone(&ctx);
            async move { ctx.sign_in("1@example.com", "pw").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let signing_out = Arc::clone(&ctx);
        tokio::task::spawn_blocking(move || signing_out.sign_out())
            .await
            .unwrap();
        signing_in.await.unwrap().unwrap();

        assert_eq!(ctx.current_user(), store.load());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_failure_keeps_authenticating_while_others_pend() {
        let endpoint = ScriptedEndpoint::default()
            .reject("bad@example.com", Duration::from_secs(1), 401)
            .accept("ok@example.com", Duration::from_secs(3), session("ok"));
        let (ctx, _store) = context(endpoint);

        let (bad, ok, _) = tokio::join!(
            ctx.sign_in("bad@example.com", "pw"),
            ctx.sign_in("ok@example.com", "pw"),
            async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(ctx.state(), AuthState::Authenticating);
            },
        );
        assert!(bad.is_err());
        ok.unwrap();

        assert_eq!(ctx.state(), AuthState::SignedIn(session("ok")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_sign_in_falls_back_to_signed_out() {
        let endpoint =
            ScriptedEndpoint::default().accept("slow@example.com", Duration::from_secs(10), session("slow"));
        let (ctx, store) = context(endpoint);

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), ctx.sign_in("slow@example.com", "pw")).await;
        assert!(abandoned.is_err());

        assert_eq!(ctx.state(), AuthState::SignedOut);
        assert_eq!(store.raw(), None);
    }

    #[test]
    fn test_restore_from_stored_session() {
        let store = MemorySessionStore::new();
        store.save(&session("7")).unwrap();

        let ctx = AuthContext::restore(ScriptedEndpoint::default(), Box::new(store));
        assert_eq!(ctx.state(), AuthState::SignedIn(session("7")));
    }

    #[test]
    fn test_restore_from_corrupt_record_is_signed_out() {
        let store = MemorySessionStore::with_raw(r#"{"userId":"7","displayName":"Us"#);

        let ctx = AuthContext::restore(ScriptedEndpoint::default(), Box::new(store));
        assert_eq!(ctx.state(), AuthState::SignedOut);
        assert_eq!(ctx.current_user(), None);
    }
}
