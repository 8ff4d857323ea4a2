//! Transient user-facing notifications ("toasts").
//!
//! Any component may raise a toast through the `NotificationCenter`; only
//! the center mutates the visible set. Each toast expires on its own timer
//! after a fixed display duration unless dismissed first.

pub mod center;

pub use center::{Notification, NotificationCenter, ToastId, ToastKind, DEFAULT_DISPLAY_MS};
