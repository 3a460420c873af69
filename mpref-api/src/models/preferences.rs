//! Music preference record

use serde::{Deserialize, Serialize};

/// Stored music preferences for one user
///
/// A user without a stored row is represented by [`MusicPreferences::empty`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicPreferences {
    pub user_id: i64,
    pub favorite_track_names: Vec<String>,
    pub favorite_artist_names: Vec<String>,
    pub genres: Vec<String>,
}

impl MusicPreferences {
    /// The implicit record returned when nothing is stored
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            favorite_track_names: Vec::new(),
            favorite_artist_names: Vec::new(),
            genres: Vec::new(),
        }
    }
}
