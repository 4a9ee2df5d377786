//! The polling loop: search, filter, enrich, notify.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::brands::AliasIndex;
use crate::enrichment::EnrichmentClient;
use crate::error::SendError;
use crate::models::{Listing, Route};
use crate::notify::{live_update, MessageSink, Renderer};
use crate::scrapers::{ScraperTrait, SearchParams};
use crate::sent::SentStore;

const CHILD_SIZE_INDICATORS: [&str; 5] = ["months", "years", "child", "kids", "baby"];

/// Whether a size label is for children's clothing
pub fn is_child_size(size_title: &str) -> bool {
    let size = size_title.to_lowercase();
    CHILD_SIZE_INDICATORS.iter().any(|indicator| size.contains(indicator))
}

/// What happened to the listings of one tick
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub fetched: usize,
    pub skipped_child_size: usize,
    pub skipped_no_brand: usize,
    pub skipped_no_owner: usize,
    pub skipped_duplicate: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct Monitor {
    scraper: Arc<dyn ScraperTrait>,
    sink: Arc<dyn MessageSink>,
    enrichment: EnrichmentClient,
    index: AliasIndex,
    renderer: Renderer,
    params: SearchParams,
    sent: SentStore,
    poll_interval: Duration,
    update_period: Duration,
}

impl Monitor {
    pub fn new(
        scraper: Arc<dyn ScraperTrait>,
        sink: Arc<dyn MessageSink>,
        enrichment: EnrichmentClient,
        index: AliasIndex,
        renderer: Renderer,
    ) -> Self {
        Self {
            scraper,
            sink,
            enrichment,
            index,
            renderer,
            params: SearchParams::default(),
            sent: SentStore::new(),
            poll_interval: Duration::from_secs(10),
            update_period: Duration::from_secs(60),
        }
    }

    pub fn with_search_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_sent_store(mut self, sent: SentStore) -> Self {
        self.sent = sent;
        self
    }

    pub fn with_intervals(mut self, poll_interval: Duration, update_period: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.update_period = update_period;
        self
    }

    #[cfg(test)]
    pub fn sent(&self) -> &SentStore {
        &self.sent
    }

    /// Poll forever
    pub async fn run(mut self) {
        info!(
            "Watching {} for {} brand aliases every {:?}",
            self.scraper.source_name(),
            self.index.len(),
            self.poll_interval
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let summary = self.tick().await;
            debug!(
                "Tick: {} fetched, skipped {} child size / {} no brand / {} no owner / {} already sent",
                summary.fetched,
                summary.skipped_child_size,
                summary.skipped_no_brand,
                summary.skipped_no_owner,
                summary.skipped_duplicate
            );
            if summary.sent > 0 || summary.failed > 0 {
                info!(
                    "Sent {} items, {} failed ({} ids remembered)",
                    summary.sent,
                    summary.failed,
                    self.sent.len()
                );
            }
        }
    }

    /// One search and the notifications it produces.
    ///
    /// Candidates are handled one after another, so an id is checked and
    /// marked within the same step and can't be sent twice.
    pub async fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();

        info!("Checking {} for new items...", self.scraper.source_name());
        let records = match self.scraper.search(&self.params).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch {} items: {:#}", self.scraper.source_name(), e);
                return summary;
            }
        };
        summary.fetched = records.len();

        for record in &records {
            let listing = Listing::from_raw(record);

            if is_child_size(&listing.size_title) {
                debug!("Skipping item {}: children's size ({})", listing.title, listing.size_title);
                summary.skipped_child_size += 1;
                continue;
            }

            let Some(route) = self.index.resolve(&listing.brand_title).cloned() else {
                debug!("Skipping item {}: no matching brand", listing.title);
                summary.skipped_no_brand += 1;
                continue;
            };

            let Some(owner_id) = listing.owner_user_id.clone() else {
                debug!("Skipping item {}: user id is missing", listing.title);
                summary.skipped_no_owner += 1;
                continue;
            };

            if self.sent.contains(&listing.id) {
                summary.skipped_duplicate += 1;
                continue;
            }

            match self.notify(listing, &owner_id, &route).await {
                Ok(id) => {
                    self.sent.insert(&id);
                    summary.sent += 1;
                }
                Err(e) => {
                    error!("Error sending item to channel {}: {}", route.channel_id, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Enrich, render and send one listing. Returns the id that was sent.
    async fn notify(
        &self,
        mut listing: Listing,
        owner_id: &str,
        route: &Route,
    ) -> Result<String, SendError> {
        debug!(
            "Sending item {} to channel {} (brand: {})",
            listing.id, route.channel_id, route.main_brand
        );

        let feedback = self
            .enrichment
            .fetch_feedback(owner_id)
            .await
            .unwrap_or(listing.feedback);
        let description = self.enrichment.fetch_description(&listing.id).await;
        listing.set_enriched_description(description);

        let message = self.renderer.render(&listing, &feedback, Utc::now());
        let handle = self.sink.send(route.channel_id, message).await?;
        info!("Sent item: {}", listing.title);

        live_update::spawn(
            self.sink.clone(),
            handle,
            listing.created_at,
            self.update_period,
        );
        Ok(listing.id)
    }
}
