use std::fmt::Display;

use thiserror::Error;

use crate::backend::BackendError;
use crate::dashboard::Page;
use crate::models::Role;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthenticated,
    Forbidden,
    Validation,
    NotFound,
    Conflict,
    Remote,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    redirect: Option<Page>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            redirect: None,
        }
    }

    pub fn not_authenticated() -> Self {
        Self::new(
            ErrorKind::NotAuthenticated,
            "not signed in or session expired",
        )
        .with_redirect(Page::Login)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// The caller is signed in but belongs on the other dashboard.
    pub fn wrong_dashboard(actual: Role) -> Self {
        Self::forbidden(format!("this page is not available to {actual} accounts"))
            .with_redirect(actual.dashboard())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, "resource not found")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(ErrorKind::Remote, error.to_string())
    }

    pub fn with_redirect(mut self, page: Page) -> Self {
        self.redirect = Some(page);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn redirect(&self) -> Option<Page> {
        self.redirect
    }
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Unauthorized => AppError::not_authenticated(),
            BackendError::PermissionDenied(message) => AppError::forbidden(message),
            BackendError::Conflict(message) => AppError::conflict(message),
            BackendError::NotFound => AppError::not_found(),
            other => AppError::internal(other),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!(error = %value, "rejected session token");
        AppError::not_authenticated()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}
