//! Classifieds search scraper.
//!
//! Drives a headless browser over a marketplace results page, extracts
//! listing records from the rendered items, retries until the page yields a
//! complete set, then downloads listing images in parallel.

pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;

pub use config::{RetryMode, ScoutConfig};
pub use error::{ScoutError, ScoutResult};
pub use models::Listing;
pub use scrapers::{ExtractionController, SearchParams, SessionReport};
