//! amz-search - Amazon search results scraper with a single HTTP endpoint.

use amz_search::commands::{SearchCommand, ServeCommand};
use amz_search::config::{Config, OutputFormat};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "amz-search",
    version,
    about = "Amazon search results scraper",
    long_about = "Scrapes Amazon search results into structured records, from the command line or over GET /search?q=<term>."
)]
struct Cli {
    /// Proxy endpoint (repeatable; one is picked at random per attempt)
    #[arg(long, global = true)]
    proxy: Vec<String>,

    /// Base delay before each attempt in milliseconds
    #[arg(long, global = true, env = "AMZ_DELAY")]
    delay: Option<u64>,

    /// Attempts shared by transport failures and CAPTCHA pages
    #[arg(long, global = true, env = "AMZ_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP search endpoint
    Serve {
        /// Address to bind
        #[arg(long, env = "AMZ_HOST")]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long, env = "AMZ_PORT")]
        port: Option<u16>,
    },

    /// Run a single search and print the results
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Create the image folder before scraping
        #[arg(long)]
        save_images: bool,

        /// Image folder used with --save-images
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if !cli.proxy.is_empty() {
        config.proxies = cli.proxy;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(max_retries) = cli.max_retries {
        config.max_retries = max_retries;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            ServeCommand::new(config).execute().await?;
        }

        Commands::Search { query, format, save_images, image_dir } => {
            if let Some(format) = format {
                config.format = format;
            }
            config.save_images |= save_images;
            if let Some(dir) = image_dir {
                config.image_dir = dir;
            }

            let output = SearchCommand::new(config).execute(&query).await?;
            println!("{}", output);
        }
    }

    Ok(())
}
