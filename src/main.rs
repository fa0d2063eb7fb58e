use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use market_scout::scrapers::ChromeBrowser;
use market_scout::{ExtractionController, ScoutConfig, SearchParams};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Search a classifieds site and collect the listings
#[derive(Debug, Parser)]
#[command(name = "market-scout", version)]
struct Cli {
    /// Search query, or a full results page URL
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Maximum number of listings to collect
    #[arg(short, long)]
    limit: Option<usize>,

    /// Maximum number of load attempts
    #[arg(short, long)]
    attempts: Option<usize>,

    /// Where to write the listings as JSON
    #[arg(short, long, env = "SCOUT_OUTPUT", default_value = "listings.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ScoutConfig::from_env()?;

    let params = SearchParams {
        query: cli.query.join(" "),
        item_limit: cli.limit.unwrap_or(config.item_limit),
        max_attempts: cli.attempts.unwrap_or(config.max_attempts),
    };
    params.validate()?;

    info!("🔎 Market Scout");
    info!("Searching for '{}'", params.query);

    let browser = ChromeBrowser::new(&config)?;
    let controller = ExtractionController::new(browser, &config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling session");
            ctrl_c.cancel();
        }
    });

    let report = controller.run(&params, &cancel).await?;

    if !report.complete {
        warn!(
            "Page never yielded a complete set after {} attempts, keeping partial results",
            report.attempts_used
        );
    }
    info!("\n✅ Collected {} listings\n", report.listings.len());

    for (i, listing) in report.listings.iter().enumerate() {
        println!("{}. {} ({})", i + 1, listing.title, listing.price);
        println!(
            "   Seller: {} | Rating: {} | Reviews: {}",
            listing.seller_name,
            listing.seller_rating.as_deref().unwrap_or("-"),
            listing.review_count
        );
        println!("   {}", listing.summary(100));
        match (&listing.image_url, &listing.image_data) {
            (Some(url), Some(data)) => println!("   Image: {} ({} bytes)", url, data.len()),
            (Some(url), None) => println!("   Image: {} (download failed)", url),
            _ => println!("   Image: none"),
        }
        println!();
    }

    let json = serde_json::to_string_pretty(&report.listings)?;
    tokio::fs::write(&cli.output, json)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    info!("💾 Saved listings to {}", cli.output.display());

    Ok(())
}
