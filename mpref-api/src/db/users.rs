//! User database operations

use mpref_common::Result;
use sqlx::{Executor, Sqlite};

use crate::models::{User, UserDraft};

/// Load all users ordered by id
pub async fn list_users<'e, E>(executor: E) -> Result<Vec<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let users = sqlx::query_as::<_, User>(
        "SELECT id, nombre, email, edad, pais FROM users ORDER BY id",
    )
    .fetch_all(executor)
    .await?;

    Ok(users)
}

/// Load one user by id
pub async fn get_user<'e, E>(executor: E, user_id: i64) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>(
        "SELECT id, nombre, email, edad, pais FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

/// Check whether a user row exists
pub async fn user_exists<'e, E>(executor: E, user_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(found.is_some())
}

/// Insert a user and return the generated id
///
/// A duplicate email surfaces as a unique violation on the returned error.
pub async fn insert_user<'e, E>(executor: E, draft: &UserDraft) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO users (nombre, email, edad, pais)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.email)
    .bind(draft.age)
    .bind(&draft.country)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Overwrite every mutable column of a user
///
/// Returns false when no row has this id.
pub async fn update_user<'e, E>(executor: E, user_id: i64, draft: &UserDraft) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET nombre = ?, email = ?, edad = ?, pais = ?
        WHERE id = ?
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.email)
    .bind(draft.age)
    .bind(&draft.country)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a user; returns false when it was already absent
pub async fn delete_user<'e, E>(executor: E, user_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
