mod listing;

pub use listing::Listing;

use serde::{Deserialize, Serialize};

/// Seller feedback counts, each defaulting to zero
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

impl FeedbackCounts {
    pub fn total(&self) -> u64 {
        self.positive
            .saturating_add(self.neutral)
            .saturating_add(self.negative)
    }

    /// Read `positive_feedback_count` and friends from a JSON object.
    /// Missing or non-numeric counts are treated as zero.
    pub fn from_object(value: &serde_json::Value) -> Self {
        let count = |key: &str| value.get(key).and_then(as_count).unwrap_or(0);

        Self {
            positive: count("positive_feedback_count"),
            neutral: count("neutral_feedback_count"),
            negative: count("negative_feedback_count"),
        }
    }
}

fn as_count(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Destination for a matched brand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    /// Canonical brand name as configured
    pub main_brand: String,
    pub channel_id: u64,
}
