//! Domain models for mpref-api

pub mod catalog;
pub mod preferences;
pub mod user;

pub use catalog::{ArtistInfo, TrackInfo};
pub use preferences::MusicPreferences;
pub use user::{User, UserDraft, UserPayload};
