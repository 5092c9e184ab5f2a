//! HTTP client for Amazon search requests using wreq for TLS fingerprint emulation.

use crate::amazon::error::ScrapeError;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use wreq::Client;
use wreq_util::Emulation;

/// A Chrome User-Agent with the platform hint that matches it.
///
/// Requests always carry the Chrome 131 TLS fingerprint and client hints, so
/// every entry is a Chrome 131 build.
struct BrowserProfile {
    user_agent: &'static str,
    platform: &'static str,
}

/// Desktop Chrome profiles rotated per attempt.
const BROWSER_PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        platform: "\"Windows\"",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        platform: "\"Windows\"",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        platform: "\"macOS\"",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        platform: "\"Linux\"",
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (X11; CrOS x86_64 14541.0.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        platform: "\"Chrome OS\"",
    },
];

/// One search attempt against the site - enables mocking for tests.
#[async_trait]
pub trait AmazonSearch: Send + Sync {
    /// Fetches the search results page for `term` once, without retrying.
    ///
    /// Any connection failure, timeout or non-2xx status is reported as
    /// [`ScrapeError::Transport`].
    async fn search(&self, term: &str) -> Result<String, ScrapeError>;

    /// Base URL that search URLs and relative links resolve against.
    fn base_url(&self) -> &Url;
}

/// Builds the search URL for `term`. The term is form-encoded, so spaces
/// become `+`.
pub fn search_url(base_url: &Url, term: &str) -> Url {
    let mut url = base_url.clone();
    url.set_path("/s");
    url.query_pairs_mut().clear().append_pair("k", term);
    url
}

/// Amazon HTTP client with browser impersonation and anti-bot measures.
///
/// A fresh connection is built for every attempt so that each one can go
/// out through a different proxy.
pub struct AmazonClient {
    base_url: Url,
    proxies: Vec<String>,
    delay_ms: u64,
    delay_jitter_ms: u64,
    timeout: Duration,
}

impl AmazonClient {
    /// Creates a new client from the configuration.
    ///
    /// Fails if the base URL or any proxy entry is malformed.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base URL: {}", config.base_url))?;

        let proxies = config
            .proxies
            .iter()
            .map(|p| -> Result<String> {
                let proxy = normalize_proxy(p);
                wreq::Proxy::all(proxy.as_str())
                    .with_context(|| format!("Failed to configure proxy: {}", p))?;
                Ok(proxy)
            })
            .collect::<Result<Vec<_>>>()?;

        if !proxies.is_empty() {
            debug!("Configured {} proxies", proxies.len());
        }

        Ok(Self {
            base_url,
            proxies,
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Builds the connection for one attempt, optionally through `proxy`.
    fn build_client(&self, proxy: Option<&str>) -> Result<Client, ScrapeError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = proxy {
            info!("Using proxy: {}", proxy_url);
            builder = builder.proxy(wreq::Proxy::all(proxy_url)?);
        }

        Ok(builder.build()?)
    }

    /// Performs a GET request with all anti-bot measures.
    async fn get(&self, url: &Url) -> Result<String, ScrapeError> {
        // Add human-like delay with jitter
        self.delay().await;

        let proxy = self.pick_proxy();
        let client = self.build_client(proxy)?;
        let profile = random_profile();

        debug!("GET {} (User-Agent: {})", url, profile.user_agent);

        let response = client
            .get(url.as_str())
            .emulation(Emulation::Chrome131)
            .header("User-Agent", profile.user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "max-age=0")
            .header("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"")
            .header("Sec-Ch-Ua-Mobile", "?0")
            .header("Sec-Ch-Ua-Platform", profile.platform)
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 503 {
            warn!("Rate limited (503). Consider using a proxy or increasing delay.");
        }

        if !status.is_success() {
            return Err(ScrapeError::Transport(format!("Request failed with status: {}", status)));
        }

        Ok(response.text().await?)
    }

    /// Sleeps `delay_ms` plus a uniform jitter in `0..=delay_jitter_ms`.
    async fn delay(&self) {
        if self.delay_ms == 0 && self.delay_jitter_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        info!("Waiting for {:.2} seconds", total_delay as f64 / 1000.0);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }

    /// Picks a proxy at random, or `None` for a direct connection.
    fn pick_proxy(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..self.proxies.len());
        Some(self.proxies[index].as_str())
    }

}

#[async_trait]
impl AmazonSearch for AmazonClient {
    async fn search(&self, term: &str) -> Result<String, ScrapeError> {
        let url = search_url(&self.base_url, term);

        info!("Scraping: {}", url);
        self.get(&url).await
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn random_profile() -> &'static BrowserProfile {
    &BROWSER_PROFILES[rand::rng().random_range(0..BROWSER_PROFILES.len())]
}

/// Bare `host:port` entries are plain HTTP proxies.
fn normalize_proxy(proxy: &str) -> String {
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}
