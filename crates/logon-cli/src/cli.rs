use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "logon", version, about = "Sign in to your account from the terminal")]
pub struct Cli {
    /// Also write logs to this file
    #[arg(long, env = "LOGON_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with e-mail and password
    SignIn {
        /// E-mail to sign in with (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored session
    SignOut,
    /// Show who is signed in
    Whoami,
    /// Password recovery
    ForgotPassword,
    /// Create a new account
    SignUp,
}
