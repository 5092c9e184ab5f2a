//! Error types for the scrape routine.

use thiserror::Error;

/// Failures of a single search attempt or of the scrape as a whole.
///
/// `Transport` and `Blocked` consume one attempt of the retry budget and are
/// never returned from [`Scraper::scrape`](crate::amazon::Scraper::scrape);
/// once the budget is spent the scrape yields an empty list instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Connection failure, timeout, non-2xx status or unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response was a CAPTCHA or robot-check page.
    #[error("blocked by bot detection ({indicator})")]
    Blocked { indicator: &'static str },

    /// Anything that is not tied to a single attempt.
    #[error("{0}")]
    Internal(String),
}

impl ScrapeError {
    /// Whether this failure consumes an attempt and allows a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::Transport(_) | ScrapeError::Blocked { .. })
    }
}

impl From<wreq::Error> for ScrapeError {
    fn from(err: wreq::Error) -> Self {
        ScrapeError::Transport(err.to_string())
    }
}

/// A single product container that could not be turned into a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// Container where every field fell back to "N/A" (ad slot, spacer).
    #[error("container {index} has no extractable fields")]
    Empty { index: usize },
}
