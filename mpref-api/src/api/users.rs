//! User CRUD endpoints
//!
//! - GET/POST /users
//! - GET/PUT/PATCH/DELETE /users/:user_id

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use mpref_common::api::Envelope;
use serde_json::Value;

use super::{json_body, user_id_param};
use crate::error::{ApiError, ApiResult};
use crate::models::{User, UserPayload};
use crate::services::users;
use crate::AppState;

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let users = users::list_users(&state.db).await?;
    Ok(Json(Envelope::ok(users)))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<User>>)> {
    let draft = json_body(body)?.into_draft()?;
    let user = users::create_user(&state.db, draft).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(user))))
}

/// GET /users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let user_id = user_id_param(path)?;
    let user = users::get_user(&state.db, user_id).await?;
    Ok(Json(Envelope::ok(user)))
}

/// PUT /users/:user_id
///
/// Full update: `name` and `email` are required again.
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let user_id = user_id_param(path)?;
    let draft = json_body(body)?.into_draft()?;
    let user = users::update_user(&state.db, user_id, draft).await?;
    Ok(Json(Envelope::ok(user)))
}

/// PATCH /users/:user_id
pub async fn patch_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let user_id = user_id_param(path)?;
    let body = json_body(body)?;
    let patch = body
        .as_object()
        .ok_or_else(|| ApiError::Validation("Request body must be a JSON object".to_string()))?;

    let user = users::patch_user(&state.db, user_id, patch).await?;
    Ok(Json(Envelope::ok(user)))
}

/// DELETE /users/:user_id
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Envelope<bool>>> {
    let user_id = user_id_param(path)?;
    users::delete_user(&state.db, user_id).await?;
    Ok(Json(Envelope::ok(true)))
}

/// Build user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:user_id",
            get(get_user)
                .put(update_user)
                .patch(patch_user)
                .delete(delete_user),
        )
}
