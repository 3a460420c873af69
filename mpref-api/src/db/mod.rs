//! Database access for mpref-api
//!
//! Query functions accept any SQLite executor so callers can run them
//! against the pool or inside a request transaction.

pub mod music_prefs;
pub mod users;
