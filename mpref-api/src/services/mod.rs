//! Services for mpref-api

pub mod catalog;
pub mod reconciliation;
pub mod spotify_client;
pub mod users;

pub use catalog::{CatalogClient, CatalogError};
pub use reconciliation::{PreferencePatch, ReplacePreferences};
pub use spotify_client::SpotifyClient;
