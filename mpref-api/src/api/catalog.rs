//! Catalog passthrough lookups

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use mpref_common::api::Envelope;

use crate::error::{ApiError, ApiResult};
use crate::models::{ArtistInfo, TrackInfo};
use crate::AppState;

/// GET /spotify/tracks/:track_id
pub async fn get_track(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
) -> ApiResult<Json<Envelope<TrackInfo>>> {
    let track = state
        .catalog
        .get_track_info(&track_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Track not found".to_string()))?;

    Ok(Json(Envelope::ok(track)))
}

/// GET /spotify/artists/:artist_id
pub async fn get_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
) -> ApiResult<Json<Envelope<ArtistInfo>>> {
    let artist = state
        .catalog
        .get_artist_info(&artist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Artist not found".to_string()))?;

    Ok(Json(Envelope::ok(artist)))
}

/// Build catalog lookup routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/spotify/tracks/:track_id", get(get_track))
        .route("/spotify/artists/:artist_id", get(get_artist))
}
