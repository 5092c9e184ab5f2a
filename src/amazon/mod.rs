//! Amazon-specific modules for fetching, parsing, and retrying searches.

pub mod client;
pub mod error;
pub mod models;
pub mod parser;
pub mod scraper;
pub mod selectors;

pub use client::{AmazonClient, AmazonSearch};
pub use error::{ExtractionError, ScrapeError};
pub use models::{ProductRecord, NOT_AVAILABLE};
pub use parser::Parser;
pub use scraper::Scraper;
