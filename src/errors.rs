use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` when no message was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Wrong credentials")]
    WrongCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Token creation error")]
    TokenCreation,

    #[error("Internal server error")]
    Internal,
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("Storage error: {:?}", e);
        AppError::Internal
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        tracing::error!("Template rendering failed: {:?}", e);
        AppError::Internal
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
            }
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            AppError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired session".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You may not change another user's profile".to_string(),
            ),
            AppError::TokenCreation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate session".to_string(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failures of the external web search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search credential file {path} could not be read")]
    Config {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("search API key not found")]
    Credentials,

    #[error("search request failed")]
    Transport(#[source] reqwest::Error),

    #[error("search API answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("search response could not be decoded")]
    Decode(#[source] reqwest::Error),
}

impl SearchError {
    /// True for failures of the remote service itself, as opposed to local misconfiguration.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            SearchError::Transport(_) | SearchError::Status(_) | SearchError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_messages_per_field() {
        let mut errors = FieldErrors::default();
        errors.add("name", "first");
        errors.add("name", "second");
        errors.add("slug", "read-only");

        assert_eq!(errors.get("name"), ["first", "second"]);
        assert!(errors.contains("slug"));
        assert!(errors.get("views").is_empty());
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = AppError::Validation(FieldErrors::single("name", "bad")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound("Category").into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
