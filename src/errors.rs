use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Missing or malformed startup configuration. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not defined in environment variables")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Failure to establish a session with the document store.
///
/// Only the gateway's retry loop ever sees these; they are logged and
/// retried, never returned to a request.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("document store unreachable: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// A request-scoped store failure.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("document store is not connected")]
    NotConnected,

    #[error("upsert for key {0:?} returned no document")]
    MissingUpsertResult(String),

    #[error("store backend failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// Handler-boundary classification of a failed request.
///
/// The response body is generic; the cause is only written to the log.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidBody(#[source] JsonRejection),

    #[error("Failed to get text")]
    GetFailed(#[source] QueryError),

    #[error("Failed to save text")]
    SaveFailed(#[source] QueryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidBody(rejection) => {
                tracing::debug!(error = %rejection, "{}", self);
                rejection.status()
            }
            ApiError::GetFailed(QueryError::NotConnected)
            | ApiError::SaveFailed(QueryError::NotConnected) => {
                tracing::warn!(error = %QueryError::NotConnected, "{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::GetFailed(cause) | ApiError::SaveFailed(cause) => {
                tracing::error!(error = %cause, "{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
