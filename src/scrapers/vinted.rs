use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::types::SearchParams;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Vinted catalog search over the site's JSON API.
///
/// The API only answers requests carrying a session cookie, which the site
/// hands out on a plain visit to its front page.
pub struct VintedScraper {
    client: Client,
    /// Base URL the current session cookie belongs to
    session: Mutex<Option<String>>,
}

impl VintedScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            session: Mutex::new(None),
        })
    }

    async fn ensure_session(&self, base_url: &str, force: bool) -> Result<()> {
        let mut session = self.session.lock().await;
        if !force && session.as_deref() == Some(base_url) {
            return Ok(());
        }

        debug!("Refreshing Vinted session cookie from {}", base_url);
        let response = self
            .client
            .get(base_url)
            .send()
            .await
            .context("Failed to fetch Vinted front page")?;

        if !response.status().is_success() {
            anyhow::bail!("Vinted front page returned status {}", response.status());
        }

        *session = Some(base_url.to_string());
        Ok(())
    }

    async fn fetch_catalog(&self, params: &SearchParams) -> Result<reqwest::Response> {
        let url = format!("{}/api/v2/catalog/items", params.base_url());
        debug!("Fetching URL: {}", url);

        self.client
            .get(&url)
            .query(&params.query())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("Failed to fetch Vinted catalog")
    }
}

#[async_trait]
impl ScraperTrait for VintedScraper {
    async fn search(&self, params: &SearchParams) -> Result<Vec<Value>> {
        let base_url = params.base_url();
        self.ensure_session(&base_url, false).await?;

        let mut response = self.fetch_catalog(params).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            info!("Vinted session expired, refreshing");
            self.ensure_session(&base_url, true).await?;
            response = self.fetch_catalog(params).await?;
        }

        if !response.status().is_success() {
            warn!("Vinted returned status: {}", response.status());
            anyhow::bail!("Failed to fetch Vinted catalog: {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to decode Vinted catalog response")?;

        let items = extract_items(body);
        debug!("Fetched {} items", items.len());
        Ok(items)
    }

    fn source_name(&self) -> &'static str {
        "Vinted"
    }
}

fn extract_items(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
