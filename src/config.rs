//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site base URL; search URLs and relative links resolve against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Proxy endpoints, one picked at random per attempt (empty = direct)
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Attempts shared by transport failures and bot-detection pages
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay before every attempt in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Create the image directory before scraping
    #[serde(default)]
    pub save_images: bool,

    /// Image directory used when `save_images` is set
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Address the HTTP endpoint binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP endpoint binds to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Output format for the `search` command
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_base_url() -> String {
    "https://www.amazon.com".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_delay_jitter_ms() -> u64 {
    3000
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            proxies: Vec::new(),
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            save_images: false,
            image_dir: default_image_dir(),
            host: default_host(),
            port: default_port(),
            format: OutputFormat::Json,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("amz-search").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("AMZ_BASE_URL") {
            self.base_url = base_url;
        }

        if let Ok(proxies) = std::env::var("AMZ_PROXIES") {
            self.proxies = split_list(&proxies);
        }

        if let Ok(retries) = std::env::var("AMZ_MAX_RETRIES") {
            if let Ok(r) = retries.parse() {
                self.max_retries = r;
            }
        }

        if let Ok(delay) = std::env::var("AMZ_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(host) = std::env::var("AMZ_HOST") {
            self.host = host;
        }

        if let Ok(port) = std::env::var("AMZ_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        self
    }

    /// Socket address string for the HTTP endpoint.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: json, table, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
