mod brands;
mod config;
mod enrichment;
mod error;
mod models;
mod monitor;
mod notify;
mod scrapers;
mod sent;

use std::sync::Arc;
use std::time::Duration;

use brands::AliasIndex;
use clap::Parser;
use config::{BrandChannels, Settings};
use enrichment::{EnrichmentClient, RapidApiTransport};
use monitor::Monitor;
use notify::{DiscordSink, Renderer};
use scrapers::VintedScraper;
use sent::SentStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::parse();

    info!("🧥 Vinted Scout");
    info!("==========================================");

    let brands = BrandChannels::load_or_empty(&settings.brands);
    let index = AliasIndex::build(&brands);
    if index.is_empty() {
        warn!("No brand aliases configured, nothing will be sent until {} is fixed", settings.brands.display());
    }

    let scraper = Arc::new(VintedScraper::new()?);
    let sink = Arc::new(DiscordSink::new(&settings.discord_token)?);
    let transport = Arc::new(RapidApiTransport::new(&settings.rapidapi_host, &settings.rapidapi_key)?);
    let enrichment = EnrichmentClient::new(transport, &settings.enrichment_country);

    let monitor = Monitor::new(
        scraper,
        sink,
        enrichment,
        index,
        Renderer::new(settings.marketplace_base()),
    )
    .with_search_params(settings.search_params())
    .with_sent_store(SentStore::with_capacity_limit(settings.sent_capacity))
    .with_intervals(
        Duration::from_secs(settings.poll_secs.max(1)),
        Duration::from_secs(settings.update_secs.max(1)),
    );

    monitor.run().await;

    Ok(())
}
