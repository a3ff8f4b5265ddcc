//! Seams to the hosted backend: row tables, auth and the shared error model.

pub mod gotrue;
pub mod query;
pub mod rest;

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AccessToken;

pub use gotrue::GoTrueClient;
pub use query::{Direction, Filter, Nulls, Order, Query};
pub use rest::PostgrestClient;

pub mod tables {
    pub const USER_PROFILES: &str = "user_profiles";
    pub const JOBS: &str = "jobs";
    pub const APPLICATIONS: &str = "applications";
    pub const CAREER_HISTORY: &str = "career_history";
    pub const EDUCATION: &str = "education";
    pub const LICENSES: &str = "licenses";
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found")]
    NotFound,
    #[error("backend returned {status}: {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Row access over the backend's table REST interface.
///
/// `token` is the signed-in user's bearer token; `None` falls back to the
/// anonymous key. Row-level policies on the backend decide what each token
/// may read or write.
#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    async fn select(&self, token: Option<&AccessToken>, query: &Query) -> BackendResult<Vec<Value>>;

    async fn insert(
        &self,
        token: Option<&AccessToken>,
        table: &str,
        row: Value,
    ) -> BackendResult<Value>;

    /// Applies `patch` to every row matched by `query` and returns the updated rows.
    async fn update(
        &self,
        token: Option<&AccessToken>,
        query: &Query,
        patch: Value,
    ) -> BackendResult<Vec<Value>>;

    /// Deletes every row matched by `query` and returns the deleted rows.
    async fn delete(&self, token: Option<&AccessToken>, query: &Query)
        -> BackendResult<Vec<Value>>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResult>;

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session>;

    async fn sign_out(&self, token: &AccessToken) -> BackendResult<()>;

    async fn user(&self, token: &AccessToken) -> BackendResult<AuthUser>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: AccessToken,
    pub user: AuthUser,
}

/// Outcome of a sign-up. `session` is absent when the project requires
/// email confirmation before the first sign-in.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteErrorBody {
    code: Option<Value>,
    error_code: Option<String>,
    error: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    #[serde(rename = "statusCode")]
    status_code: Option<Value>,
}

impl RemoteErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
    }

    fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }

    fn status(&self) -> Option<u16> {
        match &self.status_code {
            Some(Value::String(raw)) => raw.parse().ok(),
            Some(Value::Number(raw)) => raw.as_u64().and_then(|v| u16::try_from(v).ok()),
            _ => None,
        }
    }
}

/// Turns a non-success response from any of the backend services into a
/// [`BackendError`].
pub(crate) async fn error_from_response(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let raw = response.text().await.unwrap_or_default();
    let body: RemoteErrorBody = serde_json::from_str(&raw).unwrap_or_default();
    let message = body.message().unwrap_or_else(|| {
        if raw.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            raw.clone()
        }
    });
    classify(body.status().unwrap_or(status), body.code(), message)
}

pub(crate) fn classify(status: u16, code: Option<String>, message: String) -> BackendError {
    match code.as_deref() {
        Some("invalid_credentials" | "invalid_grant" | "bad_jwt" | "session_not_found") => {
            return BackendError::Unauthorized
        }
        Some("42501") => return BackendError::PermissionDenied(message),
        Some("23505" | "user_already_exists" | "email_exists" | "Duplicate") => {
            return BackendError::Conflict(message)
        }
        Some("PGRST116") => return BackendError::NotFound,
        _ => {}
    }

    match status {
        401 => BackendError::Unauthorized,
        403 => BackendError::PermissionDenied(message),
        404 => BackendError::NotFound,
        409 => BackendError::Conflict(message),
        _ => BackendError::Remote {
            status,
            code,
            message,
        },
    }
}
