//! Shared fixtures for mpref-api integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mpref_api::models::{ArtistInfo, TrackInfo};
use mpref_api::services::{CatalogClient, CatalogError};
use mpref_api::AppState;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// In-memory catalog keyed by id
#[derive(Default)]
pub struct FakeCatalog {
    pub tracks: HashMap<String, TrackInfo>,
    pub artists: HashMap<String, ArtistInfo>,
    pub auth_failure: bool,
    pub calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_track(mut self, id: &str, name: &str) -> Self {
        self.tracks.insert(
            id.to_string(),
            TrackInfo {
                id: id.to_string(),
                name: name.to_string(),
                artists: vec!["Some Artist".to_string()],
                album: Some("Some Album".to_string()),
                duration_ms: Some(180_000),
                popularity: Some(50),
                external_url: None,
            },
        );
        self
    }

    pub fn with_artist(mut self, id: &str, name: &str) -> Self {
        self.artists.insert(
            id.to_string(),
            ArtistInfo {
                id: id.to_string(),
                name: name.to_string(),
                genres: vec!["rock".to_string()],
                popularity: Some(70),
                followers: Some(1000),
                external_url: None,
            },
        );
        self
    }

    pub fn failing_auth() -> Self {
        Self {
            auth_failure: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_failure {
            Err(CatalogError::Auth("Spotify rejected the client credentials".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn get_track_info(&self, id: &str) -> Result<Option<TrackInfo>, CatalogError> {
        self.check()?;
        Ok(self.tracks.get(id).cloned())
    }

    async fn get_artist_info(&self, id: &str) -> Result<Option<ArtistInfo>, CatalogError> {
        self.check()?;
        Ok(self.artists.get(id).cloned())
    }

    async fn validate_tracks_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TrackInfo>, CatalogError> {
        self.check()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.tracks.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }

    async fn validate_artists_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ArtistInfo>, CatalogError> {
        self.check()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.artists.get(id).map(|a| (id.clone(), a.clone())))
            .collect())
    }
}

/// Router over a fresh in-memory database
pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub catalog: Arc<FakeCatalog>,
}

pub async fn test_app(catalog: FakeCatalog) -> TestApp {
    let db = mpref_common::db::init_memory_database()
        .await
        .expect("in-memory database");
    let catalog = Arc::new(catalog);
    let state = AppState::new(db.clone(), catalog.clone());

    TestApp {
        router: mpref_api::build_router(state),
        db,
        catalog,
    }
}

impl TestApp {
    /// Send a request and decode the JSON response body
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Create a user through the API and return its id
    pub async fn create_user(&self, name: &str, email: &str) -> i64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/users",
                Some(serde_json::json!({"name": name, "email": email})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }
}
