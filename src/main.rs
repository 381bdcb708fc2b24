mod aggregator;
mod catalog;
mod config;

use std::sync::Arc;

use aggregator::{AggregatorService, HttpFetcher};
use config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config::from_env()?;
    let fetcher = Arc::new(HttpFetcher::new(cfg.request_timeout_secs));

    let sources = if cfg.discover_sources {
        catalog::discover_sources(
            fetcher.as_ref(),
            &cfg.base_url,
            cfg.models_per_brand,
            cfg.source_limit,
        )
        .await?
    } else {
        catalog::default_sources(&cfg.base_url, cfg.source_limit)
    };

    let cap = cfg.per_source_cap;
    let service = AggregatorService::with_source(fetcher, cfg);
    let listings = service.aggregate(&sources, cap).await;

    println!("\n==============================");
    println!("TOTAL LISTINGS FOUND: {}", listings.len());
    println!("==============================\n");

    for listing in &listings {
        println!("{}", serde_json::to_string(listing)?);
    }

    Ok(())
}
