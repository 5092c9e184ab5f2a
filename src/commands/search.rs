//! Search command implementation.

use crate::amazon::{AmazonSearch, Scraper};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Runs a single scrape from the command line.
pub struct SearchCommand {
    config: Config,
}

impl SearchCommand {
    /// Creates a new search command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the search and returns formatted output.
    pub async fn execute(&self, query: &str) -> Result<String> {
        let scraper = Scraper::from_config(&self.config).context("Failed to create scraper")?;

        self.execute_with(&scraper, query).await
    }

    /// Executes the search with a provided scraper (for testing).
    pub async fn execute_with<C: AmazonSearch>(
        &self,
        scraper: &Scraper<C>,
        query: &str,
    ) -> Result<String> {
        info!("Searching for: {}", query);

        let records = scraper.scrape(query).await.context("Search failed")?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_records(&records))
    }
}
