//! The sign-in form: validation at the boundary, then the credential
//! exchange, then a toast if it went wrong.

use std::collections::BTreeMap;

use logon_core::{AppServices, AuthError, Authenticator, CredentialInput, Field, FieldError, ToastKind};
use tracing::debug;

pub const AUTH_ERROR_TITLE: &str = "Authentication error";
pub const AUTH_ERROR_DESCRIPTION: &str = "Could not sign in, check your credentials";

/// Form input plus the field errors currently shown next to it.
#[derive(Debug, Default)]
pub struct SignInForm {
    pub input: CredentialInput,
    pub errors: BTreeMap<Field, String>,
}

impl SignInForm {
    pub fn new(input: CredentialInput) -> Self {
        Self {
            input,
            errors: BTreeMap::new(),
        }
    }

    /// Validate and submit.
    ///
    /// Invalid input is reported through `errors` and never reaches the auth
    /// context. A failed exchange raises an error toast; the returned error
    /// says which kind of failure it was.
    pub async fn submit<A: Authenticator>(
        &mut self,
        services: &AppServices<A>,
    ) -> Result<(), AuthError> {
        self.errors.clear();

        let problems = self.input.validate();
        if !problems.is_empty() {
            debug!(count = problems.len(), "Sign-in form has invalid fields");
            self.errors = FieldError::by_field(&problems);
            return Err(AuthError::Validation(problems));
        }

        match services
            .auth
            .sign_in(self.input.email.trim(), &self.input.password)
            .await
        {
            Ok(()) => {
                self.input.password.clear();
                Ok(())
            }
            Err(e) => {
                services.toasts.add_toast(
                    ToastKind::Error,
                    AUTH_ERROR_TITLE,
                    Some(AUTH_ERROR_DESCRIPTION.to_string()),
                );
                Err(e)
            }
        }
    }
}
