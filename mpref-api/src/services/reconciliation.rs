//! Preference reconciliation
//!
//! Two write paths with different trust levels:
//! - [`replace_preferences`]: items are catalog id references. Ids are
//!   validated in one batch per kind, unknown ids become warnings, and only
//!   resolved display names are stored.
//! - [`merge_preferences`]: items are already-resolved names. Supplied fields
//!   overwrite the stored ones without contacting the catalog.

use mpref_common::api::PreferenceWarnings;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::catalog::CatalogClient;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::MusicPreferences;

const SAVE_ERROR: &str = "Error saving preferences";

/// Body of a replace request, after shape validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacePreferences {
    /// Raw track references (bare ids or objects with `id`)
    pub track_refs: Vec<Value>,
    /// Raw artist references (bare ids or objects with `id`)
    pub artist_refs: Vec<Value>,
    pub genres: Vec<String>,
}

impl ReplacePreferences {
    /// Validate the request body shape
    ///
    /// Missing reference lists default to empty; a present non-list is
    /// rejected. A non-list `genres` is stored as empty.
    pub fn from_body(body: &Value) -> ApiResult<Self> {
        let empty = Map::new();
        let map = body_object(body)?.unwrap_or(&empty);

        let track_refs = optional_list(map, "favorite_track_ids", "ids_canciones_favoritas");
        let artist_refs = optional_list(map, "favorite_artist_ids", "ids_artistas_favoritos");

        let (Some(track_refs), Some(artist_refs)) = (track_refs, artist_refs) else {
            return Err(ApiError::Validation(
                "Fields 'favorite_track_ids' and 'favorite_artist_ids' must be lists".to_string(),
            ));
        };

        let genres = match field(map, "genres", "generos") {
            Some(Value::Array(items)) => string_items(items),
            _ => Vec::new(),
        };

        Ok(Self {
            track_refs,
            artist_refs,
            genres,
        })
    }
}

/// Body of a merge request, after shape validation and name extraction
///
/// `None` means the field was not supplied and keeps its stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencePatch {
    pub favorite_track_names: Option<Vec<String>>,
    pub favorite_artist_names: Option<Vec<String>>,
    pub genres: Option<Vec<String>>,
}

impl PreferencePatch {
    /// Validate the request body shape; every supplied field must be a list
    pub fn from_body(body: &Value) -> ApiResult<Self> {
        let empty = Map::new();
        let map = body_object(body)?.unwrap_or(&empty);

        let favorite_track_names =
            patch_list(map, "favorite_track_names", "canciones_favoritas")?.map(|items| extract_names(&items));
        let favorite_artist_names =
            patch_list(map, "favorite_artist_names", "artistas_favoritos")?.map(|items| extract_names(&items));
        let genres = patch_list(map, "genres", "generos")?.map(|items| string_items(&items));

        Ok(Self {
            favorite_track_names,
            favorite_artist_names,
            genres,
        })
    }

    /// Shallow merge: each supplied field replaces the current one
    pub fn apply(self, current: MusicPreferences) -> MusicPreferences {
        MusicPreferences {
            user_id: current.user_id,
            favorite_track_names: self.favorite_track_names.unwrap_or(current.favorite_track_names),
            favorite_artist_names: self
                .favorite_artist_names
                .unwrap_or(current.favorite_artist_names),
            genres: self.genres.unwrap_or(current.genres),
        }
    }
}

impl From<&MusicPreferences> for PreferencePatch {
    fn from(prefs: &MusicPreferences) -> Self {
        Self {
            favorite_track_names: Some(prefs.favorite_track_names.clone()),
            favorite_artist_names: Some(prefs.favorite_artist_names.clone()),
            genres: Some(prefs.genres.clone()),
        }
    }
}

/// `None` for a `null` body, which reads as an empty object
fn body_object(body: &Value) -> ApiResult<Option<&Map<String, Value>>> {
    match body {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        _ => Err(ApiError::Validation(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| map.get(alias))
}

/// `Some(list)` when absent (empty) or an array, `None` when present but not a list
fn optional_list(map: &Map<String, Value>, key: &str, alias: &str) -> Option<Vec<Value>> {
    match field(map, key, alias) {
        None => Some(Vec::new()),
        Some(Value::Array(items)) => Some(items.clone()),
        Some(_) => None,
    }
}

fn patch_list(map: &Map<String, Value>, key: &str, alias: &str) -> ApiResult<Option<Vec<Value>>> {
    match field(map, key, alias) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(_) => Err(ApiError::Validation(format!("Field '{}' must be a list", key))),
    }
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Pull string-valued `field` out of each item
///
/// Bare strings pass through; objects contribute `item[field]` when it is a
/// string; everything else is dropped silently.
fn extract_by_field(items: &[Value], field: &str) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get(field).and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Identifier extraction for replace: `"id"` or `{"id": "id"}`
pub fn extract_ids(items: &[Value]) -> Vec<String> {
    extract_by_field(items, "id")
}

/// Name extraction for merge: `"name"` or `{"name": "name"}`
pub fn extract_names(items: &[Value]) -> Vec<String> {
    extract_by_field(items, "name")
}

/// Order-preserving de-duplication
fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}

/// Split `ids` into resolved names and invalid ids, both in input order
fn partition_resolved<T>(
    ids: &[String],
    found: &HashMap<String, T>,
    name_of: impl Fn(&T) -> &str,
) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut invalid = Vec::new();

    for id in ids {
        match found.get(id) {
            Some(entry) => names.push(name_of(entry).to_string()),
            None => invalid.push(id.clone()),
        }
    }

    (names, invalid)
}

/// Stored preferences, or the implicit empty record
pub async fn get_preferences(pool: &SqlitePool, user_id: i64) -> ApiResult<MusicPreferences> {
    let prefs = db::music_prefs::get_music_prefs(pool, user_id)
        .await
        .map_err(ApiError::persistence("Error loading preferences"))?;

    Ok(prefs.unwrap_or_else(|| MusicPreferences::empty(user_id)))
}

/// Replace all preferences from catalog id references
///
/// The catalog is consulted only after the body and the owning user have been
/// validated, and nothing is written if it fails.
pub async fn replace_preferences(
    pool: &SqlitePool,
    catalog: &dyn CatalogClient,
    user_id: i64,
    request: ReplacePreferences,
) -> ApiResult<(MusicPreferences, PreferenceWarnings)> {
    let exists = db::users::user_exists(pool, user_id)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?;
    if !exists {
        return Err(ApiError::NotFound(format!("User with id {} does not exist", user_id)));
    }

    let track_ids = extract_ids(&request.track_refs);
    let artist_ids = extract_ids(&request.artist_refs);

    debug!(
        user_id,
        tracks = track_ids.len(),
        artists = artist_ids.len(),
        "Validating preference ids against catalog"
    );

    let valid_tracks = if track_ids.is_empty() {
        HashMap::new()
    } else {
        catalog.validate_tracks_batch(&dedup(&track_ids)).await?
    };
    let valid_artists = if artist_ids.is_empty() {
        HashMap::new()
    } else {
        catalog.validate_artists_batch(&dedup(&artist_ids)).await?
    };

    let (track_names, invalid_track_ids) =
        partition_resolved(&track_ids, &valid_tracks, |t| t.name.as_str());
    let (artist_names, invalid_artist_ids) =
        partition_resolved(&artist_ids, &valid_artists, |a| a.name.as_str());

    let prefs = MusicPreferences {
        user_id,
        favorite_track_names: track_names,
        favorite_artist_names: artist_names,
        genres: request.genres,
    };

    let stored = store(pool, &prefs).await?;

    let warnings = PreferenceWarnings {
        invalid_track_ids,
        invalid_artist_ids,
    };

    info!(
        user_id,
        invalid_tracks = warnings.invalid_track_ids.len(),
        invalid_artists = warnings.invalid_artist_ids.len(),
        "Replaced music preferences"
    );

    Ok((stored, warnings))
}

/// Merge already-resolved names over the stored preferences
pub async fn merge_preferences(
    pool: &SqlitePool,
    user_id: i64,
    patch: PreferencePatch,
) -> ApiResult<MusicPreferences> {
    let mut tx = pool.begin().await.map_err(ApiError::persistence(SAVE_ERROR))?;

    let exists = db::users::user_exists(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?;
    if !exists {
        return Err(ApiError::NotFound(format!("User with id {} does not exist", user_id)));
    }

    let current = db::music_prefs::get_music_prefs(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?
        .unwrap_or_else(|| MusicPreferences::empty(user_id));

    let merged = patch.apply(current);

    db::music_prefs::upsert_music_prefs(&mut *tx, &merged)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?;

    let stored = db::music_prefs::get_music_prefs(&mut *tx, user_id)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?
        .unwrap_or(merged);

    tx.commit().await.map_err(ApiError::persistence(SAVE_ERROR))?;

    info!(user_id, "Merged music preferences");
    Ok(stored)
}

/// Upsert inside a transaction that re-checks the owner
async fn store(pool: &SqlitePool, prefs: &MusicPreferences) -> ApiResult<MusicPreferences> {
    let mut tx = pool.begin().await.map_err(ApiError::persistence(SAVE_ERROR))?;

    let exists = db::users::user_exists(&mut *tx, prefs.user_id)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?;
    if !exists {
        return Err(ApiError::NotFound(format!(
            "User with id {} does not exist",
            prefs.user_id
        )));
    }

    db::music_prefs::upsert_music_prefs(&mut *tx, prefs)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?;

    let stored = db::music_prefs::get_music_prefs(&mut *tx, prefs.user_id)
        .await
        .map_err(ApiError::persistence(SAVE_ERROR))?
        .unwrap_or_else(|| prefs.clone());

    tx.commit().await.map_err(ApiError::persistence(SAVE_ERROR))?;

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtistInfo, TrackInfo};
    use crate::services::catalog::CatalogError;
    use async_trait::async_trait;
    use mpref_common::db::init_memory_database;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCatalog {
        tracks: HashMap<String, String>,
        artists: HashMap<String, String>,
        fail_auth: bool,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn with_track(mut self, id: &str, name: &str) -> Self {
            self.tracks.insert(id.to_string(), name.to_string());
            self
        }

        fn with_artist(mut self, id: &str, name: &str) -> Self {
            self.artists.insert(id.to_string(), name.to_string());
            self
        }
    }

    fn track(id: &str, name: &str) -> TrackInfo {
        TrackInfo {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![],
            album: None,
            duration_ms: None,
            popularity: None,
            external_url: None,
        }
    }

    fn artist(id: &str, name: &str) -> ArtistInfo {
        ArtistInfo {
            id: id.to_string(),
            name: name.to_string(),
            genres: vec![],
            popularity: None,
            followers: None,
            external_url: None,
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn get_track_info(&self, id: &str) -> Result<Option<TrackInfo>, CatalogError> {
            Ok(self.tracks.get(id).map(|n| track(id, n)))
        }

        async fn get_artist_info(&self, id: &str) -> Result<Option<ArtistInfo>, CatalogError> {
            Ok(self.artists.get(id).map(|n| artist(id, n)))
        }

        async fn validate_tracks_batch(
            &self,
            ids: &[String],
        ) -> Result<HashMap<String, TrackInfo>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_auth {
                return Err(CatalogError::Auth("invalid client".into()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.tracks.get(id).map(|n| (id.clone(), track(id, n))))
                .collect())
        }

        async fn validate_artists_batch(
            &self,
            ids: &[String],
        ) -> Result<HashMap<String, ArtistInfo>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_auth {
                return Err(CatalogError::Auth("invalid client".into()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.artists.get(id).map(|n| (id.clone(), artist(id, n))))
                .collect())
        }
    }

    async fn pool_with_user() -> (SqlitePool, i64) {
        let pool = init_memory_database().await.unwrap();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (nombre, email) VALUES ('Ana', 'ana@example.com') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        (pool, id)
    }

    #[test]
    fn test_extract_ids_drops_unusable_items() {
        let items = vec![
            json!("t1"),
            json!({"id": "t2", "name": "ignored"}),
            json!({"name": "no id"}),
            json!(17),
            json!(null),
            json!({"id": 5}),
            json!(["nested"]),
        ];
        assert_eq!(extract_ids(&items), vec!["t1".to_string(), "t2".to_string()]);
    }

    #[test]
    fn test_extract_names_uses_name_field() {
        let items = vec![json!("Song A"), json!({"id": "t2", "name": "Song B"}), json!({"id": "t3"})];
        assert_eq!(extract_names(&items), vec!["Song A".to_string(), "Song B".to_string()]);
    }

    #[test]
    fn test_partition_preserves_input_order_and_duplicates() {
        let ids: Vec<String> = ["b", "x", "a", "b", "y"].iter().map(|s| s.to_string()).collect();
        let found: HashMap<String, String> =
            [("a".to_string(), "A".to_string()), ("b".to_string(), "B".to_string())].into();

        let (names, invalid) = partition_resolved(&ids, &found, |n| n.as_str());

        assert_eq!(names, vec!["B", "A", "B"]);
        assert_eq!(invalid, vec!["x", "y"]);
    }

    #[test]
    fn test_replace_body_rejects_non_list_refs() {
        let err = ReplacePreferences::from_body(&json!({"favorite_track_ids": "t1"})).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = ReplacePreferences::from_body(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_replace_body_defaults_and_legacy_names() {
        let request = ReplacePreferences::from_body(&json!({
            "ids_canciones_favoritas": ["t1"],
            "generos": "rock"
        }))
        .unwrap();

        assert_eq!(request.track_refs, vec![json!("t1")]);
        assert!(request.artist_refs.is_empty());
        assert!(request.genres.is_empty(), "non-list genres are stored as empty");
    }

    #[test]
    fn test_null_body_reads_as_empty_object() {
        assert_eq!(
            ReplacePreferences::from_body(&Value::Null).unwrap(),
            ReplacePreferences::default()
        );
        assert_eq!(
            PreferencePatch::from_body(&Value::Null).unwrap(),
            PreferencePatch::default()
        );
        assert!(PreferencePatch::from_body(&json!("genres")).is_err());
    }

    #[test]
    fn test_patch_body_rejects_null_and_scalars() {
        assert!(PreferencePatch::from_body(&json!({"genres": null})).is_err());
        assert!(PreferencePatch::from_body(&json!({"favorite_track_names": "Song"})).is_err());
        assert_eq!(
            PreferencePatch::from_body(&json!({})).unwrap(),
            PreferencePatch::default()
        );
    }

    #[test]
    fn test_patch_apply_replaces_only_supplied_fields() {
        let current = MusicPreferences {
            user_id: 1,
            favorite_track_names: vec!["Old".into()],
            favorite_artist_names: vec!["Artist".into()],
            genres: vec!["rock".into()],
        };
        let patch = PreferencePatch::from_body(&json!({"favorite_track_names": ["New", {"name": "Newer"}]})).unwrap();

        let merged = patch.apply(current);

        assert_eq!(merged.favorite_track_names, vec!["New", "Newer"]);
        assert_eq!(merged.favorite_artist_names, vec!["Artist"]);
        assert_eq!(merged.genres, vec!["rock"]);
    }

    #[tokio::test]
    async fn test_replace_stores_resolved_names_and_warns() {
        let (pool, user_id) = pool_with_user().await;
        let catalog = FakeCatalog::default()
            .with_track("t1", "Song A")
            .with_artist("a1", "Artist A");

        let request = ReplacePreferences::from_body(&json!({
            "favorite_track_ids": ["t1", {"id": "t2"}],
            "favorite_artist_ids": [{"id": "a9"}, "a1"],
            "genres": ["rock", "jazz"]
        }))
        .unwrap();

        let (stored, warnings) = replace_preferences(&pool, &catalog, user_id, request)
            .await
            .unwrap();

        assert_eq!(stored.favorite_track_names, vec!["Song A"]);
        assert_eq!(stored.favorite_artist_names, vec!["Artist A"]);
        assert_eq!(stored.genres, vec!["rock", "jazz"]);
        assert_eq!(warnings.invalid_track_ids, vec!["t2"]);
        assert_eq!(warnings.invalid_artist_ids, vec!["a9"]);
    }

    #[tokio::test]
    async fn test_replace_for_unknown_user_skips_catalog() {
        let (pool, _) = pool_with_user().await;
        let catalog = FakeCatalog::default().with_track("t1", "Song A");

        let request = ReplacePreferences::from_body(&json!({"favorite_track_ids": ["t1"]})).unwrap();
        let err = replace_preferences(&pool, &catalog, 999, request).await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_replace_auth_failure_writes_nothing() {
        let (pool, user_id) = pool_with_user().await;
        let catalog = FakeCatalog {
            fail_auth: true,
            ..Default::default()
        };

        let request = ReplacePreferences::from_body(&json!({"favorite_track_ids": ["t1"], "genres": ["rock"]})).unwrap();
        let err = replace_preferences(&pool, &catalog, user_id, request).await.unwrap_err();

        assert!(matches!(err, ApiError::CatalogAuth(_)));
        assert!(db::music_prefs::get_music_prefs(&pool, user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_with_empty_lists_makes_no_catalog_call() {
        let (pool, user_id) = pool_with_user().await;
        let catalog = FakeCatalog::default();

        let request = ReplacePreferences::from_body(&json!({"genres": ["pop"]})).unwrap();
        let (stored, warnings) = replace_preferences(&pool, &catalog, user_id, request).await.unwrap();

        assert_eq!(stored.genres, vec!["pop"]);
        assert!(warnings.is_empty());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent_with_its_own_output() {
        let (pool, user_id) = pool_with_user().await;

        let first = merge_preferences(
            &pool,
            user_id,
            PreferencePatch::from_body(&json!({
                "favorite_track_names": ["Song A", {"name": "Song B"}],
                "genres": ["rock"]
            }))
            .unwrap(),
        )
        .await
        .unwrap();

        let second = merge_preferences(&pool, user_id, PreferencePatch::from(&first))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(get_preferences(&pool, user_id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_merge_for_unknown_user_is_not_found() {
        let (pool, _) = pool_with_user().await;

        let err = merge_preferences(&pool, 404, PreferencePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_preferences_defaults_to_empty_record() {
        let (pool, user_id) = pool_with_user().await;

        let prefs = get_preferences(&pool, user_id).await.unwrap();
        assert_eq!(prefs, MusicPreferences::empty(user_id));
    }
}
