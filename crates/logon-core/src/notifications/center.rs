use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

/// How long a toast stays visible when nobody dismisses it.
pub const DEFAULT_DISPLAY_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn label(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        }
    }
}

/// Identifier of a toast, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Ids are drawn from one counter shared by every center in the process.
static NEXT_TOAST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: ToastId,
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

struct Inner {
    entries: watch::Sender<Vec<Notification>>,
    display_duration: Duration,
}

impl Inner {
    fn remove(&self, id: ToastId) -> bool {
        self.entries.send_if_modified(|entries| {
            let before = entries.len();
            entries.retain(|n| n.id != id);
            entries.len() != before
        })
    }
}

/// Ordered queue of visible toasts, oldest first.
///
/// Clones share the same queue. Expiry timers hold only a weak reference,
/// so dropping the last clone cancels nothing and leaks nothing.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DISPLAY_MS))
    }
}

impl NotificationCenter {
    pub fn new(display_duration: Duration) -> Self {
        let (entries, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                entries,
                display_duration,
            }),
        }
    }

    pub fn display_duration(&self) -> Duration {
        self.inner.display_duration
    }

    /// Append a toast and schedule its expiry.
    ///
    /// Outside a tokio runtime, or while one is shutting down, the toast is
    /// still appended but stays until dismissed. The same holds on a runtime
    /// built without its time driver (`enable_time`): tokio offers no way to
    /// ask for it up front, so the expiry task fails inside its own task and
    /// the toast is simply never removed by a timer. `add_toast` itself does
    /// not panic in any of these cases.
    pub fn add_toast(
        &self,
        kind: ToastKind,
        title: impl Into<String>,
        description: Option<String>,
    ) -> ToastId {
        let id = ToastId(NEXT_TOAST_ID.fetch_add(1, Ordering::Relaxed));
        let notification = Notification {
            id,
            kind,
            title: title.into(),
            description,
            created_at: Utc::now(),
        };
        debug!(%id, kind = kind.label(), title = %notification.title, "Toast added");
        self.inner
            .entries
            .send_modify(|entries| entries.push(notification));

        self.schedule_expiry(id);
        id
    }

    /// Dismiss a toast. Unknown or already expired ids are ignored.
    pub fn remove_toast(&self, id: ToastId) {
        if self.inner.remove(id) {
            debug!(%id, "Toast dismissed");
        }
    }

    /// Visible toasts in insertion order.
    pub fn list(&self) -> Vec<Notification> {
        self.inner.entries.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Observe the visible set. The receiver starts at the current set.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.entries.subscribe()
    }

    fn schedule_expiry(&self, id: ToastId) {
        let Ok(handle) = Handle::try_current() else {
            debug!(%id, "No runtime available, toast will not expire on its own");
            return;
        };

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.display_duration;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                if inner.remove(id) {
                    debug!(%id, "Toast expired");
                }
            }
        });
    }
}
