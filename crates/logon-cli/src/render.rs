//! Plain-text rendering of toasts and form errors.

use std::collections::BTreeMap;

use logon_core::{Field, Notification};

pub fn toast_line(toast: &Notification) -> String {
    match toast.description {
        Some(ref description) => format!(
            "[{}] {}: {}",
            toast.kind.label(),
            toast.title,
            description
        ),
        None => format!("[{}] {}", toast.kind.label(), toast.title),
    }
}

pub fn print_toasts(toasts: &[Notification]) {
    for toast in toasts {
        eprintln!("{}", toast_line(toast));
    }
}

pub fn print_field_errors(errors: &BTreeMap<Field, String>) {
    for (field, message) in errors {
        eprintln!("  {}: {}", field, message);
    }
}
