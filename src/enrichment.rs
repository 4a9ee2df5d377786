//! Seller feedback and item descriptions from the RapidAPI Vinted mirror.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::FetchError;
use crate::models::FeedbackCounts;

/// One GET returning JSON
#[async_trait]
pub trait EnrichmentTransport: Send + Sync {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError>;
}

/// `reqwest` transport sending the RapidAPI host/key headers
pub struct RapidApiTransport {
    client: Client,
    base_url: String,
    host: String,
    key: String,
}

impl RapidApiTransport {
    pub fn new(host: &str, key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create enrichment HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("https://{host}"),
            host: host.to_string(),
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl EnrichmentTransport for RapidApiTransport {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Fixed exponential backoff: `base_delay * 2^attempt` after each retryable failure
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Fetches enrichment data. Every failure ends up as `None`.
#[derive(Clone)]
pub struct EnrichmentClient {
    transport: Arc<dyn EnrichmentTransport>,
    country: String,
    policy: RetryPolicy,
}

impl EnrichmentClient {
    pub fn new(transport: Arc<dyn EnrichmentTransport>, country: &str) -> Self {
        Self {
            transport,
            country: country.to_string(),
            policy: RetryPolicy::default(),
        }
    }

    /// Seller feedback counts for a user
    pub async fn fetch_feedback(&self, user_id: &str) -> Option<FeedbackCounts> {
        let query = [
            ("country", self.country.clone()),
            ("user_id", user_id.to_string()),
        ];
        let Some(data) = self.get_with_retry("/getUserByID", &query).await else {
            error!("Failed to fetch feedback for user {} after retries", user_id);
            return None;
        };
        debug!("Feedback data for user {}: {}", user_id, data);

        // Counts sit at the top level or under `user`, depending on the endpoint version
        let source = if data.get("positive_feedback_count").is_some() {
            &data
        } else {
            data.get("user").unwrap_or(&data)
        };
        Some(FeedbackCounts::from_object(source))
    }

    /// Description of an item, if the source has a non-blank one
    pub async fn fetch_description(&self, item_id: &str) -> Option<String> {
        let query = [
            ("country", self.country.clone()),
            ("product_id", item_id.to_string()),
        ];
        let Some(data) = self.get_with_retry("/getProductByID", &query).await else {
            error!("Failed to fetch description for item {} after retries", item_id);
            return None;
        };

        data.get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }

    async fn get_with_retry(&self, path: &str, query: &[(&str, String)]) -> Option<Value> {
        for attempt in 0..self.policy.max_attempts {
            match self.transport.get_json(path, query).await {
                Ok(data) => return Some(data),
                Err(e) if !e.is_retryable() => {
                    error!("HTTP error from {}: {}, giving up", path, e);
                    return None;
                }
                Err(e) => {
                    if matches!(e, FetchError::RateLimited) {
                        warn!("Rate limit exceeded on {}, retrying", path);
                    } else {
                        error!("Request error on {}: {}", path, e);
                    }
                    tokio::time::sleep(self.policy.delay_for_attempt(attempt)).await;
                }
            }
        }
        None
    }
}
