//! Pieces shared by the command-line front ends.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::auth::{self, CurrentUser};
use crate::config::AppConfig;
use crate::dashboard::Notice;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Loads `.env`, installs logging and connects to the configured project.
pub fn bootstrap(component: &'static str) -> Result<AppState> {
    dotenv::dotenv().ok();
    init_tracing();
    let config = AppConfig::from_env()?;
    tracing::debug!(component, project = %config.supabase_url, "loaded configuration");
    AppState::connect(config)
}

/// How a command proves who is calling: a saved access token, or email and
/// password for a fresh sign-in.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    #[arg(long, global = true, env = "JOBBOARD_EMAIL")]
    pub email: Option<String>,
    #[arg(long, global = true, env = "JOBBOARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long, global = true, env = "JOBBOARD_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

impl SessionArgs {
    pub async fn sign_in(&self, state: &AppState) -> AppResult<CurrentUser> {
        if let Some(token) = &self.access_token {
            return auth::resume(state, token).await;
        }
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => auth::login(state, email, password).await,
            _ => Err(AppError::not_authenticated()),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints `value` as JSON, or through `human` for terminal output.
pub fn emit<T, F>(json: bool, value: &T, human: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T),
{
    if json {
        print_json(value)
    } else {
        human(value);
        Ok(())
    }
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

/// Shows a failed command as a banner, with the page to go to when the
/// failure implies one, and turns it into a failing exit code.
pub fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<AppError>() {
        Some(app_err) => {
            eprintln!("{}", Notice::from(app_err));
            if let Some(page) = app_err.redirect() {
                eprintln!("-> continue at {}", page.path());
            }
        }
        None => eprintln!("[danger] {err:#}"),
    }
    ExitCode::FAILURE
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}
