use crate::scrapers::types::SearchParams;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Marketplace search client.
/// Returns raw listing records; turning them into `Listing`s is the caller's job.
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Fetch one page of listings
    async fn search(&self, params: &SearchParams) -> Result<Vec<Value>>;

    /// Get the name of the marketplace
    fn source_name(&self) -> &'static str;
}
