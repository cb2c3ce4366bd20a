//! # bazaar_core
//!
//! Core session and token logic for Bazaar.

pub mod auth;
pub mod clock;
pub mod config;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
