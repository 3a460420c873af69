//! HTTP API handlers for mpref-api
//!
//! Every route except `/health` answers with the `{data, error}` envelope.

pub mod catalog;
pub mod health;
pub mod preferences;
pub mod users;

pub use catalog::catalog_routes;
pub use health::health_routes;
pub use preferences::preference_routes;
pub use users::user_routes;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;

use crate::error::{ApiError, ApiResult};

/// A `:user_id` segment that is not an integer cannot name a user
pub(crate) fn user_id_param(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id).map_err(|_| ApiError::user_not_found())
}

/// Malformed or non-JSON bodies are validation failures
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(format!("Invalid JSON body: {}", rejection.body_text())))
}
