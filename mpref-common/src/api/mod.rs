//! Shared HTTP API types
//!
//! Framework-independent request/response shapes; the service crate wraps
//! them in axum responses.

pub mod types;

pub use types::{Envelope, PreferenceWarnings};
