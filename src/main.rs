//! duckscrape CLI - DuckDuckGo search from the command line.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use duckscrape::{endpoint::CountryTable, Search, SearchConfig, SearchError, SearchOptions};

/// duckscrape - DuckDuckGo HTML search client
#[derive(Parser)]
#[command(name = "duckscrape")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search
    Search(SearchArgs),
}

#[derive(Parser)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Two-letter country code
    #[arg(short, long, default_value = "us")]
    country: String,

    /// Interface language code
    #[arg(short = 'L', long, default_value = "en")]
    language: String,

    /// Maximum number of results (0 for no limit)
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Result offset for paging
    #[arg(short, long, default_value = "0")]
    start: usize,

    /// Proxy URLs to rotate through (comma-separated),
    /// e.g. http://127.0.0.1:8080,socks5://127.0.0.1:1080
    #[arg(short, long, value_delimiter = ',')]
    proxy: Vec<String>,

    /// Requests per second (unlimited when omitted)
    #[arg(short, long)]
    rate: Option<f64>,

    /// Burst size for the rate limit
    #[arg(short, long, default_value = "1")]
    burst: u32,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Override the results endpoint (base URL ending in `q=`)
    #[arg(long)]
    endpoint: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    match cli.command {
        Commands::Search(args) => run_search(args).await,
    }
}

async fn run_search(args: SearchArgs) -> Result<ExitCode> {
    let mut config = SearchConfig::new().with_timeout(Duration::from_secs(args.timeout));
    if let Some(rate) = args.rate {
        config = config.with_rate_limit(rate, args.burst);
    }
    if let Some(endpoint) = &args.endpoint {
        config = config.with_countries(CountryTable::single(endpoint.as_str()));
    }
    let search = Search::with_config(config)?;

    let options = SearchOptions::new()
        .with_country(&args.country)
        .with_language(&args.language)
        .with_limit(args.limit)
        .with_start(args.start)
        .with_proxies(&args.proxy);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let results = match search.search(&args.query, &options, &cancel).await {
        Ok(results) => results,
        Err(SearchError::NoResults) => {
            eprintln!("No results for \"{}\"", args.query);
            return Ok(ExitCode::from(1));
        }
        Err(SearchError::Blocked) => {
            eprintln!("DuckDuckGo blocked the request; slow down or use a proxy");
            return Ok(ExitCode::from(2));
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Search cancelled");
            return Ok(ExitCode::from(130));
        }
        Err(e) => return Err(e.into()),
    };

    match args.format {
        OutputFormat::Text => {
            println!(
                "\nSearch results for \"{}\" ({} results in {}ms):\n",
                args.query, results.count, results.duration_ms
            );

            for (i, result) in results.items().iter().enumerate() {
                println!("{}. {}", i + 1, result.title);
                println!("   URL: {}", result.url);
                if !result.description.is_empty() {
                    let description: String = result.description.chars().take(150).collect();
                    if description.len() < result.description.len() {
                        println!("   {}...", description);
                    } else {
                        println!("   {}", description);
                    }
                }
                println!();
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results.items())?);
        }
        OutputFormat::Compact => {
            for result in results.items() {
                println!("{}\t{}", result.title, result.url);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
