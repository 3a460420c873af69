//! # mpref Common Library
//!
//! Shared code for the mpref service crates:
//! - Error type for infrastructure failures
//! - Bootstrap configuration loading
//! - Database bootstrap and schema
//! - Response envelope types

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
