//! Search-and-parse routine with a shared retry budget.
//!
//! One scrape walks the states below until it reaches `Success` or
//! `Exhausted`:
//!
//! ```text
//! Attempting ──clean page──────────▶ Success
//!     │ ├──bot-detection page──▶ BlockedRetry ───┐
//!     │ └──transport failure───▶ TransportRetry ─┤ attempts < max ─▶ Attempting
//!     │                                          └ attempts = max ─▶ Exhausted
//! ```
//!
//! Both retry states draw from the same budget. `Exhausted` is not an error:
//! the scrape returns the records accumulated so far, which is always empty
//! because a clean page ends the scrape immediately.

use crate::amazon::client::{AmazonClient, AmazonSearch};
use crate::amazon::error::ScrapeError;
use crate::amazon::models::ProductRecord;
use crate::amazon::parser::{detect_block, Parser};
use crate::config::Config;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// State of a scrape between attempts.
#[derive(Debug)]
enum AttemptState {
    Attempting,
    Success(Vec<ProductRecord>),
    BlockedRetry,
    TransportRetry,
    Exhausted,
}

/// Runs searches against Amazon and turns result pages into records.
pub struct Scraper<C = AmazonClient> {
    client: C,
    parser: Parser,
    max_retries: u32,
    image_dir: Option<PathBuf>,
}

impl Scraper<AmazonClient> {
    /// Builds a scraper backed by the real HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = AmazonClient::new(config)?;
        let scraper = Self::new(client, config.max_retries);

        Ok(if config.save_images {
            scraper.with_image_dir(&config.image_dir)
        } else {
            scraper
        })
    }
}

impl<C: AmazonSearch> Scraper<C> {
    /// Creates a scraper over any search client.
    pub fn new(client: C, max_retries: u32) -> Self {
        let parser = Parser::new(client.base_url().clone());
        Self { client, parser, max_retries, image_dir: None }
    }

    /// Enables image saving mode: `dir` is created before the first attempt.
    pub fn with_image_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.image_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Disables image saving mode.
    pub fn without_images(mut self) -> Self {
        self.image_dir = None;
        self
    }

    /// Scrapes with the configured retry budget.
    pub async fn scrape(&self, term: &str) -> Result<Vec<ProductRecord>, ScrapeError> {
        self.scrape_with_retries(term, self.max_retries).await
    }

    /// Scrapes `term`, spending at most `max_retries` attempts.
    ///
    /// Transport failures and bot-detection pages never surface here: once
    /// the budget is spent the result is an empty list. Only failures that
    /// are not tied to an attempt are returned as errors.
    pub async fn scrape_with_retries(
        &self,
        term: &str,
        max_retries: u32,
    ) -> Result<Vec<ProductRecord>, ScrapeError> {
        self.prepare_image_dir().await?;

        let mut attempts = 0;
        let mut state =
            if max_retries == 0 { AttemptState::Exhausted } else { AttemptState::Attempting };

        loop {
            state = match state {
                AttemptState::Attempting => self.attempt(term).await?,
                AttemptState::BlockedRetry | AttemptState::TransportRetry => {
                    attempts += 1;
                    if attempts < max_retries {
                        info!("Retrying ({}/{})...", attempts, max_retries);
                        AttemptState::Attempting
                    } else {
                        AttemptState::Exhausted
                    }
                }
                AttemptState::Success(records) => {
                    info!("Found {} products for {:?}", records.len(), term);
                    return Ok(records);
                }
                AttemptState::Exhausted => {
                    if attempts == 0 {
                        debug!("Retry budget is zero, skipping search for {:?}", term);
                    } else {
                        error!("Maximum retry attempts reached");
                    }
                    return Ok(Vec::new());
                }
            };
        }
    }

    /// Runs one attempt and classifies its outcome.
    async fn attempt(&self, term: &str) -> Result<AttemptState, ScrapeError> {
        match self.fetch_page(term).await {
            Ok(body) => {
                info!("Request successful, parsing content");
                Ok(AttemptState::Success(self.parser.parse_search(&body)))
            }
            Err(e) if e.is_retryable() => {
                if let ScrapeError::Blocked { .. } = e {
                    warn!("CAPTCHA or robot check detected: {}", e);
                    Ok(AttemptState::BlockedRetry)
                } else {
                    error!("Request failed: {}", e);
                    Ok(AttemptState::TransportRetry)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches one page, turning bot-detection pages into [`ScrapeError::Blocked`].
    async fn fetch_page(&self, term: &str) -> Result<String, ScrapeError> {
        let body = self.client.search(term).await?;

        match detect_block(&body) {
            Some(indicator) => Err(ScrapeError::Blocked { indicator }),
            None => Ok(body),
        }
    }

    async fn prepare_image_dir(&self) -> Result<(), ScrapeError> {
        let Some(dir) = &self.image_dir else {
            return Ok(());
        };

        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ScrapeError::Internal(format!(
                    "Failed to create image folder {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            info!("Created image folder: {}", dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use url::Url;

    const TWO_PRODUCTS: &str = r#"
        <html><body>
            <div data-component-type="s-search-result" data-asin="B0FIRST001"><h2>First</h2></div>
            <div data-component-type="s-search-result" data-asin="B0SECOND01"><h2>Second</h2></div>
        </body></html>
    "#;

    /// Scripted search client: pops one response per attempt.
    struct MockAmazonClient {
        responses: Mutex<Vec<Result<String, ScrapeError>>>,
        call_count: AtomicU32,
        base_url: Url,
    }

    impl MockAmazonClient {
        fn new(mut responses: Vec<Result<String, ScrapeError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                call_count: AtomicU32::new(0),
                base_url: Url::parse("https://www.amazon.com").unwrap(),
            }
        }

        fn call_count(&self) -> u32 {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AmazonSearch for MockAmazonClient {
        async fn search(&self, _term: &str) -> Result<String, ScrapeError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("<html></html>".to_string()))
        }

        fn base_url(&self) -> &Url {
            &self.base_url
        }
    }

    fn transport() -> Result<String, ScrapeError> {
        Err(ScrapeError::Transport("connection reset".to_string()))
    }

    fn page(html: &str) -> Result<String, ScrapeError> {
        Ok(html.to_string())
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let scraper = Scraper::new(MockAmazonClient::new(vec![page(TWO_PRODUCTS)]), 3);

        let records = scraper.scrape("headphones").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(scraper.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_clean_empty_page_does_not_retry() {
        let scraper = Scraper::new(MockAmazonClient::new(vec![page("<html></html>")]), 3);

        let records = scraper.scrape("nothing").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(scraper.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_captcha_every_attempt_exhausts_budget() {
        let captcha = || page("<html><title>Amazon CAPTCHA</title></html>");
        let client = MockAmazonClient::new(vec![captcha(), captcha(), captcha(), captcha()]);
        let scraper = Scraper::new(client, 3);

        let records = scraper.scrape("headphones").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(scraper.client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_then_success() {
        let client = MockAmazonClient::new(vec![transport(), page(TWO_PRODUCTS)]);
        let scraper = Scraper::new(client, 3);

        let records = scraper.scrape("headphones").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].asin, "B0FIRST001");
        assert_eq!(scraper.client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_budget_shared_between_failure_classes() {
        let client = MockAmazonClient::new(vec![
            transport(),
            page("Type the characters you see: Robot Check"),
            transport(),
            page(TWO_PRODUCTS),
        ]);
        let scraper = Scraper::new(client, 3);

        let records = scraper.scrape("headphones").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(scraper.client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_blocked_error_from_client_is_retried() {
        let client = MockAmazonClient::new(vec![
            Err(ScrapeError::Blocked { indicator: "captcha" }),
            page(TWO_PRODUCTS),
        ]);
        let scraper = Scraper::new(client, 2);

        let records = scraper.scrape("headphones").await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_blocked_page_classified_as_blocked_error() {
        let client = MockAmazonClient::new(vec![page("<title>Robot Check</title>")]);
        let scraper = Scraper::new(client, 1);

        let err = scraper.fetch_page("headphones").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Blocked { indicator: "robot check" }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_internal_error_is_not_retried() {
        let client = MockAmazonClient::new(vec![Err(ScrapeError::Internal("boom".to_string()))]);
        let scraper = Scraper::new(client, 3);

        let err = scraper.scrape("headphones").await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(scraper.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_makes_no_attempt() {
        let scraper = Scraper::new(MockAmazonClient::new(vec![page(TWO_PRODUCTS)]), 3);

        let records = scraper.scrape_with_retries("headphones", 0).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(scraper.client.call_count(), 0);
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn test_zero_retries_does_not_report_exhaustion() {
        let (logs, _guard) = capture_logs();
        let scraper = Scraper::new(MockAmazonClient::new(vec![]), 0);

        scraper.scrape("headphones").await.unwrap();

        let output = logs.contents();
        assert!(!output.contains("Maximum retry attempts reached"));
        assert!(output.contains("Retry budget is zero"));
    }

    #[tokio::test]
    async fn test_spent_budget_reports_exhaustion() {
        let (logs, _guard) = capture_logs();
        let scraper = Scraper::new(MockAmazonClient::new(vec![transport()]), 1);

        scraper.scrape("headphones").await.unwrap();

        assert!(logs.contents().contains("Maximum retry attempts reached"));
    }

    #[tokio::test]
    async fn test_image_dir_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("images");

        let scraper = Scraper::new(MockAmazonClient::new(vec![page(TWO_PRODUCTS)]), 1)
            .with_image_dir(&dir);

        scraper.scrape("headphones").await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_image_dir_failure_is_internal_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot hold a subdirectory
        let dir = tmp.path().join("images");

        let scraper = Scraper::new(MockAmazonClient::new(vec![page(TWO_PRODUCTS)]), 1)
            .with_image_dir(&dir);

        let err = scraper.scrape("headphones").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Internal(_)));
        assert!(err.to_string().contains("Failed to create image folder"));
        assert_eq!(scraper.client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_without_images_skips_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("images");

        let scraper = Scraper::new(MockAmazonClient::new(vec![page(TWO_PRODUCTS)]), 1)
            .with_image_dir(&dir)
            .without_images();

        scraper.scrape("headphones").await.unwrap();
        assert!(!dir.exists());
    }
}
