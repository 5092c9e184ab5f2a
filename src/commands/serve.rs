//! Serve command: runs the HTTP endpoint.

use crate::amazon::Scraper;
use crate::config::Config;
use crate::server;
use anyhow::{Context, Result};
use tracing::info;

/// Binds the search endpoint and serves until the process is stopped.
pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    /// Creates a new serve command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Starts listening on the configured host and port.
    pub async fn execute(&self) -> Result<()> {
        let scraper = Scraper::from_config(&self.config).context("Failed to create scraper")?;
        let app = server::router(scraper);

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("Search API listening on http://{}/search?q=<term>", addr);
        axum::serve(listener, app).await.context("Server error")?;

        Ok(())
    }
}
