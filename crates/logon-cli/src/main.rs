//! logon - sign in to your account from the terminal.
//!
//! This binary is a thin presentation layer over `logon-core`: it collects
//! credentials, validates them, drives the auth context and prints whatever
//! toasts the services raised.

mod cli;
mod form;
mod logging;
mod render;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use logon_core::{AppServices, AuthError, Config, CredentialInput, ToastKind};
use tracing::{info, warn};

use cli::{Cli, Command};
use form::SignInForm;

/// Password taken from the environment instead of prompting
const ENV_PASSWORD: &str = "LOGON_PASSWORD";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    let _log_guard = logging::init_tracing(args.log_file.as_deref());
    info!("logon starting");

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let services = AppServices::from_config(&config)?;

    let code = match args.command {
        Command::SignIn { email } => sign_in(&services, &mut config, email).await?,
        Command::SignOut => {
            services.auth.sign_out();
            services
                .toasts
                .add_toast(ToastKind::Success, "Signed out", None);
            ExitCode::SUCCESS
        }
        Command::Whoami => match services.auth.current_user() {
            Some(session) => {
                println!("{} <{}>", session.display_name, session.email);
                ExitCode::SUCCESS
            }
            None => {
                println!("Not signed in");
                ExitCode::FAILURE
            }
        },
        Command::ForgotPassword => {
            services.toasts.add_toast(
                ToastKind::Info,
                "Password recovery",
                Some("Password reset is not available yet".to_string()),
            );
            ExitCode::SUCCESS
        }
        Command::SignUp => {
            services.toasts.add_toast(
                ToastKind::Info,
                "Create account",
                Some(sign_up_hint(&config)),
            );
            ExitCode::SUCCESS
        }
    };

    render::print_toasts(&services.toasts.list());
    info!("logon shutting down");
    Ok(code)
}

async fn sign_in(
    services: &AppServices,
    config: &mut Config,
    email: Option<String>,
) -> Result<ExitCode> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_email()?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let mut form = SignInForm::new(CredentialInput::new(email, password));
    match form.submit(services).await {
        Ok(()) => {
            if let Some(session) = services.auth.current_user() {
                println!("Welcome, {}!", session.display_name);
            }
            config.last_email = Some(form.input.email.trim().to_string());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(AuthError::Validation(_)) => {
            eprintln!("Please fix the following:");
            render::print_field_errors(&form.errors);
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

/// Where to send someone who has no account yet.
fn sign_up_hint(config: &Config) -> String {
    match config.signup_url.as_deref() {
        Some(url) => format!("Sign up at {}", url),
        None => "Ask your administrator for an account".to_string(),
    }
}

fn prompt_email() -> Result<String> {
    print!("E-mail: ");
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(email.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_hint_uses_configured_page() {
        let config = Config {
            signup_url: Some("https://app.example.com/register".to_string()),
            ..Config::default()
        };
        assert_eq!(sign_up_hint(&config), "Sign up at https://app.example.com/register");
    }

    #[test]
    fn test_sign_up_hint_never_guesses_from_api_url() {
        let config = Config {
            api_base_url: "https://auth.example.com".to_string(),
            ..Config::default()
        };
        let hint = sign_up_hint(&config);
        assert!(!hint.contains("auth.example.com"));
        assert_eq!(hint, "Ask your administrator for an account");
    }
}
