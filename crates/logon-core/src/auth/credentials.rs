//! Sign-in form input and its field-level validation.
//!
//! Validation belongs to whoever collects the input. `AuthContext` assumes
//! it receives well-formed credentials and never calls into this module.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

/// Loose shape check: something@something.tld, no whitespace.
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Email,
    Password,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }

    /// Collapse errors into the first message per field, for rendering next
    /// to each input.
    pub fn by_field(errors: &[FieldError]) -> BTreeMap<Field, String> {
        let mut map = BTreeMap::new();
        for error in errors {
            map.entry(error.field).or_insert_with(|| error.message.clone());
        }
        map
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Transient credentials as typed by the user. Never persisted.
#[derive(Clone, Default)]
pub struct CredentialInput {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CredentialInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check every field and report all failures, in field order.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError::new(Field::Email, "E-mail is required"));
        } else if !valid_email(email) {
            errors.push(FieldError::new(Field::Email, "Enter a valid e-mail address"));
        }

        if self.password.is_empty() {
            errors.push(FieldError::new(Field::Password, "Password is required"));
        }

        errors
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).is_ok_and(|re| re.is_match(email))
}
