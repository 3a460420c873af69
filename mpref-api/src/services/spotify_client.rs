//! Spotify Web API client
//!
//! Resolves track and artist ids using the client-credentials flow. The
//! access token is cached until shortly before it expires; catalog data is
//! never cached and failed requests are not retried.

use async_trait::async_trait;
use mpref_common::config::{CatalogConfig, CatalogCredentials};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::catalog::{CatalogClient, CatalogError};
use crate::models::{ArtistInfo, TrackInfo};

const USER_AGENT: &str = concat!("mpref/", env!("CARGO_PKG_VERSION"));

/// Maximum ids per `/tracks` or `/artists` request
const BATCH_LIMIT: usize = 50;

/// Refresh the token this long before Spotify says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const CATALOG_ID_LEN: usize = 22;

/// True when `id` has the shape of a Spotify id (22 base62 characters)
///
/// Anything else cannot exist in the catalog, and sending it in a batch would
/// fail the whole request with HTTP 400.
pub fn is_catalog_id(id: &str) -> bool {
    id.len() == CATALOG_ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<NamedRef>,
    album: Option<NamedRef>,
    duration_ms: Option<u64>,
    popularity: Option<u32>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl From<SpotifyTrack> for TrackInfo {
    fn from(track: SpotifyTrack) -> Self {
        TrackInfo {
            id: track.id,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.map(|a| a.name),
            duration_ms: track.duration_ms,
            popularity: track.popularity,
            external_url: track.external_urls.spotify,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Followers {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    popularity: Option<u32>,
    followers: Option<Followers>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl From<SpotifyArtist> for ArtistInfo {
    fn from(artist: SpotifyArtist) -> Self {
        ArtistInfo {
            id: artist.id,
            name: artist.name,
            genres: artist.genres,
            popularity: artist.popularity,
            followers: artist.followers.and_then(|f| f.total),
            external_url: artist.external_urls.spotify,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    tracks: Vec<Option<SpotifyTrack>>,
}

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    artists: Vec<Option<SpotifyArtist>>,
}

/// Spotify catalog client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    credentials: Option<CatalogCredentials>,
    api_base_url: String,
    token_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Build a client; `credentials: None` makes every call fail with
    /// [`CatalogError::Auth`] without touching the network.
    pub fn new(
        config: &CatalogConfig,
        credentials: Option<CatalogCredentials>,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            token: Mutex::new(None),
        })
    }

    /// Return a valid access token, requesting a new one when needed
    async fn access_token(&self) -> Result<String, CatalogError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            CatalogError::Auth("Spotify credentials are not configured".to_string())
        })?;

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!(url = %self.token_url, "Requesting Spotify access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == 400 || status == 401 {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Spotify rejected client credentials");
            return Err(CatalogError::Auth(format!(
                "Spotify rejected the client credentials: {}",
                error_text
            )));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        tracing::info!(expires_in = body.expires_in, "Obtained Spotify access token");

        Ok(body.access_token)
    }

    /// GET `{api_base_url}/{path}`; `Ok(None)` on 404
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, CatalogError> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_base_url, path);

        tracing::debug!(url = %url, "Querying Spotify API");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Ok(None);
        }

        if status == 401 {
            *self.token.lock().await = None;
            return Err(CatalogError::Auth(
                "Spotify rejected the access token".to_string(),
            ));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        let body = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(Some(body))
    }

    /// Resolve ids in chunks; `fetch` returns one optional entry per requested id
    async fn resolve_batch<T, F, Fut>(
        &self,
        ids: &[String],
        fetch: F,
    ) -> Result<HashMap<String, T>, CatalogError>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Option<T>>, CatalogError>>,
    {
        let mut seen = HashSet::new();
        let candidates: Vec<&String> = ids
            .iter()
            .filter(|id| is_catalog_id(id))
            .filter(|id| seen.insert(id.as_str()))
            .collect();

        let mut found = HashMap::with_capacity(candidates.len());

        for chunk in candidates.chunks(BATCH_LIMIT) {
            let joined = chunk.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(",");
            let entries = fetch(joined).await?;

            for (id, entry) in chunk.iter().zip(entries) {
                if let Some(entry) = entry {
                    found.insert((*id).clone(), entry);
                }
            }
        }

        tracing::info!(
            requested = ids.len(),
            found = found.len(),
            "Validated ids against Spotify"
        );

        Ok(found)
    }
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    async fn get_track_info(&self, id: &str) -> Result<Option<TrackInfo>, CatalogError> {
        if !is_catalog_id(id) {
            return Ok(None);
        }
        let track: Option<SpotifyTrack> = self.get_json(&format!("tracks/{}", id), &[]).await?;
        Ok(track.map(TrackInfo::from))
    }

    async fn get_artist_info(&self, id: &str) -> Result<Option<ArtistInfo>, CatalogError> {
        if !is_catalog_id(id) {
            return Ok(None);
        }
        let artist: Option<SpotifyArtist> = self.get_json(&format!("artists/{}", id), &[]).await?;
        Ok(artist.map(ArtistInfo::from))
    }

    async fn validate_tracks_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TrackInfo>, CatalogError> {
        self.resolve_batch(ids, |joined| async move {
            let response: Option<TracksResponse> =
                self.get_json("tracks", &[("ids", joined)]).await?;
            Ok(response
                .map(|r| r.tracks.into_iter().map(|t| t.map(TrackInfo::from)).collect())
                .unwrap_or_default())
        })
        .await
    }

    async fn validate_artists_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ArtistInfo>, CatalogError> {
        self.resolve_batch(ids, |joined| async move {
            let response: Option<ArtistsResponse> =
                self.get_json("artists", &[("ids", joined)]).await?;
            Ok(response
                .map(|r| r.artists.into_iter().map(|a| a.map(ArtistInfo::from)).collect())
                .unwrap_or_default())
        })
        .await
    }
}
