//! Error types for mpref-api
//!
//! Every variant renders as the `{data: null, error}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mpref_common::api::Envelope;
use thiserror::Error;

use crate::services::catalog::CatalogError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad shape or missing required field (400)
    #[error("{0}")]
    Validation(String),

    /// Missing user, track, or artist (404)
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique key (400)
    #[error("{0}")]
    Conflict(String),

    /// Catalog credentials missing or rejected (502)
    #[error("{0}")]
    CatalogAuth(String),

    /// Any other catalog transport/response failure (502)
    #[error("Error communicating with the music catalog: {0}")]
    Catalog(String),

    /// Database failure (500); `context` is the only text shown to callers
    #[error("{context}")]
    Persistence {
        context: String,
        #[source]
        source: mpref_common::Error,
    },
}

impl ApiError {
    /// Wrap a persistence failure with a caller-safe message
    ///
    /// Accepts raw `sqlx::Error`s (pool and transaction calls) as well as
    /// `mpref_common::Error`s from the query layer.
    pub fn persistence<E>(context: &'static str) -> impl FnOnce(E) -> ApiError
    where
        E: Into<mpref_common::Error>,
    {
        move |source| ApiError::Persistence {
            context: context.to_string(),
            source: source.into(),
        }
    }

    /// Map a user write failure: UNIQUE(email) becomes a conflict
    pub fn user_write(context: &'static str) -> impl FnOnce(mpref_common::Error) -> ApiError {
        move |source| {
            if source.is_unique_violation() {
                ApiError::Conflict("Email is already in use".to_string())
            } else {
                ApiError::persistence(context)(source)
            }
        }
    }

    pub fn user_not_found() -> Self {
        ApiError::NotFound("User not found".to_string())
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CatalogAuth(_) | ApiError::Catalog(_) => StatusCode::BAD_GATEWAY,
            ApiError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        if err.is_auth() {
            ApiError::CatalogAuth(err.to_string())
        } else {
            ApiError::Catalog(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Persistence { context, source } => {
                tracing::error!(error = %source, "{}", context);
            }
            ApiError::CatalogAuth(msg) | ApiError::Catalog(msg) => {
                tracing::warn!(status = status.as_u16(), "Catalog failure: {}", msg);
            }
            _ => {
                tracing::debug!(status = status.as_u16(), "Request rejected: {}", self);
            }
        }

        (status, Json(Envelope::failure(self.to_string()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
