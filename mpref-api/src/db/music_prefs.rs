//! Music preference database operations
//!
//! List columns are JSON arrays stored as text. NULL or empty text reads as
//! an empty list; non-string array items from older rows are skipped.

use mpref_common::Result;
use serde_json::Value;
use sqlx::{Executor, Sqlite};

use crate::models::MusicPreferences;

#[derive(Debug, sqlx::FromRow)]
struct MusicPrefsRow {
    user_id: i64,
    canciones_favoritas: Option<String>,
    artistas_favoritos: Option<String>,
    generos: Option<String>,
}

impl MusicPrefsRow {
    fn into_preferences(self) -> Result<MusicPreferences> {
        Ok(MusicPreferences {
            user_id: self.user_id,
            favorite_track_names: decode_list(self.canciones_favoritas.as_deref())?,
            favorite_artist_names: decode_list(self.artistas_favoritos.as_deref())?,
            genres: decode_list(self.generos.as_deref())?,
        })
    }
}

fn decode_list(raw: Option<&str>) -> Result<Vec<String>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(Vec::new()),
        Some(raw) => raw,
    };

    let items: Vec<Value> = serde_json::from_str(raw)?;
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

fn encode_list(items: &[String]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Load the stored preferences for a user, if any
pub async fn get_music_prefs<'e, E>(executor: E, user_id: i64) -> Result<Option<MusicPreferences>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, MusicPrefsRow>(
        r#"
        SELECT user_id, canciones_favoritas, artistas_favoritos, generos
        FROM music_prefs
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    row.map(MusicPrefsRow::into_preferences).transpose()
}

/// Insert or replace the preferences row owned by `prefs.user_id`
///
/// The owning user must exist (foreign key).
pub async fn upsert_music_prefs<'e, E>(executor: E, prefs: &MusicPreferences) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO music_prefs (user_id, canciones_favoritas, artistas_favoritos, generos)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            canciones_favoritas = excluded.canciones_favoritas,
            artistas_favoritos = excluded.artistas_favoritos,
            generos = excluded.generos
        "#,
    )
    .bind(prefs.user_id)
    .bind(encode_list(&prefs.favorite_track_names)?)
    .bind(encode_list(&prefs.favorite_artist_names)?)
    .bind(encode_list(&prefs.genres)?)
    .execute(executor)
    .await?;

    Ok(())
}

/// Remove the preferences row for a user; returns the number of rows deleted
pub async fn delete_music_prefs<'e, E>(executor: E, user_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM music_prefs WHERE user_id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
