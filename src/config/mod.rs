//! Scrape request configuration
//!
//! This module defines the full set of inputs a caller supplies for one
//! scrape invocation, along with field-level validation that runs before
//! any network access.

mod types;
mod validation;

pub use types::{ScrapeRequest, SelectorKind, DEFAULT_DETAIL_IMAGE_ATTRIBUTE, DEFAULT_DETAIL_URL_ATTRIBUTE};
pub use validation::validate;
