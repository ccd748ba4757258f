#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! HTTP clients for the upstream civic message services.
//!
//! Each upstream is described by a TOML file under `services/` (see
//! [`registry`]). [`client::UpstreamClient`] fetches and validates
//! messages and sources for any of them. The caching and cooldown helpers
//! in [`cache`] and [`cooldown`] are explicit objects so callers (and
//! tests) decide their lifetime and clock.
//!
//! This crate performs no retries. A failed request surfaces as an
//! [`UpstreamError`] and the caller decides what to do next.

pub mod cache;
pub mod client;
pub mod cooldown;
pub mod query;
pub mod registry;

use civic_feed_message::ValidationError;

pub use client::UpstreamClient;
pub use query::MessageQuery;

/// Errors from upstream operations.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The request could not be sent, or the upstream answered with a
    /// non-2xx status.
    #[error("{context}: request failed ({message})")]
    Transport {
        /// Which response was being fetched.
        context: &'static str,
        /// Status text or connection error description.
        message: String,
    },

    /// The response body does not match the expected schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The service is unknown or lacks the requested endpoint.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },
}
