//! Music preference endpoints
//!
//! PUT replaces everything from catalog ids and reports unresolved ids as
//! warnings. PATCH merges already-resolved names without a catalog call.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::get,
    Json, Router,
};
use mpref_common::api::Envelope;
use serde_json::Value;

use super::{json_body, user_id_param};
use crate::error::ApiResult;
use crate::models::MusicPreferences;
use crate::services::reconciliation::{self, PreferencePatch, ReplacePreferences};
use crate::AppState;

/// GET /users/:user_id/music-prefs
///
/// No user check: an unknown id yields the implicit empty record.
pub async fn get_preferences(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Envelope<MusicPreferences>>> {
    let user_id = user_id_param(path)?;
    let prefs = reconciliation::get_preferences(&state.db, user_id).await?;
    Ok(Json(Envelope::ok(prefs)))
}

/// PUT /users/:user_id/music-prefs
pub async fn replace_preferences(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<MusicPreferences>>> {
    let user_id = user_id_param(path)?;
    let request = ReplacePreferences::from_body(&json_body(body)?)?;

    let (prefs, warnings) =
        reconciliation::replace_preferences(&state.db, state.catalog.as_ref(), user_id, request)
            .await?;

    Ok(Json(Envelope::with_warnings(prefs, warnings)))
}

/// PATCH /users/:user_id/music-prefs
pub async fn merge_preferences(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<MusicPreferences>>> {
    let user_id = user_id_param(path)?;
    let patch = PreferencePatch::from_body(&json_body(body)?)?;

    let prefs = reconciliation::merge_preferences(&state.db, user_id, patch).await?;
    Ok(Json(Envelope::ok(prefs)))
}

/// Build preference routes
pub fn preference_routes() -> Router<AppState> {
    Router::new().route(
        "/users/:user_id/music-prefs",
        get(get_preferences)
            .put(replace_preferences)
            .patch(merge_preferences),
    )
}
