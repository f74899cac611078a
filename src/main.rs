use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use feedpipe::{lifecycle, CacheValidators, FeedParser, FetchConfig, HttpHandle};

/// Default config file path (~/.config/feedpipe/config.toml)
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("feedpipe")
            .join("config.toml"),
    )
}

#[derive(Parser, Debug)]
#[command(name = "feedpipe", version, about = "Fetch and parse RSS/Atom feeds")]
struct Args {
    /// TOML config file (defaults to ~/.config/feedpipe/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a feed over HTTP and print it as JSON
    Fetch {
        url: String,

        /// ETag from a previous fetch
        #[arg(long, default_value = "")]
        etag: String,

        /// Last-Modified from a previous fetch, as a Unix timestamp
        #[arg(long, default_value_t = 0)]
        last_modified: i64,

        /// Netscape-format cookie file to read and update
        #[arg(long, value_name = "FILE")]
        cookie_jar: Option<PathBuf>,
    },
    /// Parse a feed file and print it as JSON
    Parse { file: PathBuf },
}

fn load_config(path: Option<PathBuf>) -> Result<FetchConfig> {
    let Some(path) = path.or_else(default_config_path) else {
        return Ok(FetchConfig::default());
    };
    FetchConfig::load(&path).with_context(|| format!("Failed to load config '{}'", path.display()))
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config)?;
    let mut parser = FeedParser::new(config);

    let feed = match args.command {
        Command::Fetch {
            url,
            etag,
            last_modified,
            cookie_jar,
        } => {
            let validators = CacheValidators::new(last_modified, etag);
            let mut handle = HttpHandle::new();
            let feed = parser
                .parse_url(&url, &validators, Some(&mut handle), None, cookie_jar.as_deref())
                .await
                .with_context(|| format!("Failed to fetch '{}'", url))?;
            eprintln!("last-modified: {}", parser.last_modified());
            eprintln!("etag: {}", parser.etag());
            feed
        }
        Command::Parse { file } => parser
            .parse_file(&file)
            .with_context(|| format!("Failed to parse '{}'", file.display()))?,
    };

    let json = serde_json::to_string_pretty(&feed).context("Failed to serialize feed")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    lifecycle::ensure_initialized();
    let result = run(args).await;
    lifecycle::shutdown();
    result
}
