//! User management
//!
//! Each write runs in its own transaction. Deleting a user also removes the
//! user's music preferences.

use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{User, UserDraft};

pub async fn list_users(pool: &SqlitePool) -> ApiResult<Vec<User>> {
    db::users::list_users(pool)
        .await
        .map_err(ApiError::persistence("Error loading users"))
}

pub async fn get_user(pool: &SqlitePool, user_id: i64) -> ApiResult<User> {
    db::users::get_user(pool, user_id)
        .await
        .map_err(ApiError::persistence("Error loading user"))?
        .ok_or_else(ApiError::user_not_found)
}

/// Insert a user and return the stored record
pub async fn create_user(pool: &SqlitePool, draft: UserDraft) -> ApiResult<User> {
    const CONTEXT: &str = "Error creating user";

    let mut tx = pool.begin().await.map_err(ApiError::persistence(CONTEXT))?;

    let user_id = db::users::insert_user(&mut *tx, &draft)
        .await
        .map_err(ApiError::user_write(CONTEXT))?;

    let user = db::users::get_user(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(CONTEXT))?
        .ok_or_else(ApiError::user_not_found)?;

    tx.commit().await.map_err(ApiError::persistence(CONTEXT))?;

    info!(user_id, "Created user");
    Ok(user)
}

/// Full replacement of the mutable fields
pub async fn update_user(pool: &SqlitePool, user_id: i64, draft: UserDraft) -> ApiResult<User> {
    const CONTEXT: &str = "Error updating user";

    let mut tx = pool.begin().await.map_err(ApiError::persistence(CONTEXT))?;

    let updated = db::users::update_user(&mut *tx, user_id, &draft)
        .await
        .map_err(ApiError::user_write(CONTEXT))?;
    if !updated {
        return Err(ApiError::user_not_found());
    }

    let user = db::users::get_user(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(CONTEXT))?
        .ok_or_else(ApiError::user_not_found)?;

    tx.commit().await.map_err(ApiError::persistence(CONTEXT))?;

    info!(user_id, "Updated user");
    Ok(user)
}

/// Partial update; the merged record must still carry a name and email
pub async fn patch_user(
    pool: &SqlitePool,
    user_id: i64,
    patch: &Map<String, Value>,
) -> ApiResult<User> {
    const CONTEXT: &str = "Error updating user";

    let mut tx = pool.begin().await.map_err(ApiError::persistence(CONTEXT))?;

    let current = db::users::get_user(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(CONTEXT))?
        .ok_or_else(ApiError::user_not_found)?;

    let draft = UserDraft::patched(&current, patch)?;

    db::users::update_user(&mut *tx, user_id, &draft)
        .await
        .map_err(ApiError::user_write(CONTEXT))?;

    let user = db::users::get_user(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(CONTEXT))?
        .ok_or_else(ApiError::user_not_found)?;

    tx.commit().await.map_err(ApiError::persistence(CONTEXT))?;

    info!(user_id, "Patched user");
    Ok(user)
}

/// Delete a user together with their preferences
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> ApiResult<()> {
    const CONTEXT: &str = "Error deleting user";

    let mut tx = pool.begin().await.map_err(ApiError::persistence(CONTEXT))?;

    // The foreign key also cascades
    let removed_prefs = db::music_prefs::delete_music_prefs(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(CONTEXT))?;

    let deleted = db::users::delete_user(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(CONTEXT))?;
    if !deleted {
        return Err(ApiError::user_not_found());
    }

    tx.commit().await.map_err(ApiError::persistence(CONTEXT))?;

    info!(user_id, removed_prefs, "Deleted user");
    Ok(())
}
