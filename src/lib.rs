//! amz-search - Amazon search results scraper with a single HTTP endpoint.
//!
//! Fetches a search page with browser impersonation, retries through
//! transport failures and bot-detection pages, and extracts one
//! [`ProductRecord`] per product card.

pub mod amazon;
pub mod commands;
pub mod config;
pub mod format;
pub mod server;

pub use amazon::models::{ProductRecord, NOT_AVAILABLE};
pub use amazon::scraper::Scraper;
pub use config::Config;
