//! Music catalog collaborator
//!
//! The preference service only depends on this trait; production wires in
//! [`SpotifyClient`](super::SpotifyClient), tests substitute a fake.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{ArtistInfo, TrackInfo};

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Credentials missing or rejected; never worth retrying
    #[error("{0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    pub fn is_auth(&self) -> bool {
        matches!(self, CatalogError::Auth(_))
    }
}

/// Lookups against the external music catalog
///
/// Batch methods return a map restricted to the ids that exist; an id absent
/// from the map is unknown to the catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_track_info(&self, id: &str) -> Result<Option<TrackInfo>, CatalogError>;

    async fn get_artist_info(&self, id: &str) -> Result<Option<ArtistInfo>, CatalogError>;

    async fn validate_tracks_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TrackInfo>, CatalogError>;

    async fn validate_artists_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ArtistInfo>, CatalogError>;
}
