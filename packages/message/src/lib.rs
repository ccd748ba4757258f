#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Validation and normalization of upstream civic messages.
//!
//! The pipeline has three stages, each usable on its own:
//!
//! 1. [`schema`] parses raw JSON into typed [`IncomingMessage`] values and
//!    rejects the whole payload on the first shape violation.
//! 2. [`geometry`] picks a representative map position and collects every
//!    position a message mentions.
//! 3. [`snippet`], [`timespan`] and [`dates`] derive presentation fields.
//!
//! [`mapper`] ties them together into a [`NewsItem`]. Everything past the
//! schema layer is total: no input that survived validation can make it
//! fail.
//!
//! [`IncomingMessage`]: civic_feed_message_models::IncomingMessage
//! [`NewsItem`]: civic_feed_message_models::NewsItem

pub mod dates;
pub mod geometry;
pub mod mapper;
pub mod schema;
pub mod snippet;
pub mod timespan;

pub use mapper::{MappingContext, SourceIndex, map_message, map_messages};
pub use schema::{ValidationError, parse_message, parse_messages, parse_sources};
pub use snippet::{DEFAULT_SNIPPET_LENGTH, extract_snippet};
