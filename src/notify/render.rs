use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{FeedbackCounts, Listing};

/// Index of the "time uploaded" field, the one refreshed after sending
pub const TIME_FIELD_INDEX: usize = 0;
pub const TIME_FIELD_NAME: &str = "⌛ Time Uploaded";

const EMBED_COLOR: u32 = 5_763_719;
const STAR: &str = "⭐️";
const NOT_FOUND: &str = "Not found";

/// A rendered notification, independent of the channel it is sent to
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub color: u32,
    pub fields: Vec<Field>,
    pub footer: String,
    pub links: Vec<LinkButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Field {
    fn inline(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// Builds notifications for one marketplace site
#[derive(Debug, Clone)]
pub struct Renderer {
    /// e.g. `https://www.vinted.co.uk`
    marketplace_base: String,
    footer: String,
}

impl Renderer {
    pub fn new(marketplace_base: impl Into<String>) -> Self {
        Self {
            marketplace_base: marketplace_base.into().trim_end_matches('/').to_string(),
            footer: "VintBot".to_string(),
        }
    }

    pub fn render(&self, listing: &Listing, feedback: &FeedbackCounts, now: DateTime<Utc>) -> Message {
        let url = non_empty_or(&listing.url, NOT_FOUND);
        let image_url = Some(listing.photo_url.clone()).filter(|u| u.starts_with("http"));

        let fields = vec![
            Field::inline(TIME_FIELD_NAME, time_ago(listing.created_at, now)),
            Field::inline("🔖 Brand", non_empty_or(&listing.brand_title, NOT_FOUND)),
            Field::inline("📏 Size", non_empty_or(&listing.size_title, "Not specified")),
            Field::inline("💰 Price", format_price(listing.price, &listing.currency)),
            Field::inline("🏷 Condition", non_empty_or(&listing.status, "Not specified")),
            Field::inline(
                "⭐ Seller Rating",
                format!("{} ({})", star_rating(feedback), feedback.total()),
            ),
        ];

        Message {
            title: non_empty_or(&listing.title, NOT_FOUND),
            description: format!(
                "**[New item found!]({})**\n\n{}",
                url,
                listing.display_description()
            ),
            links: self.links(&listing.id, &url),
            url,
            image_url,
            color: EMBED_COLOR,
            fields,
            footer: self.footer.clone(),
        }
    }

    fn links(&self, item_id: &str, listing_url: &str) -> Vec<LinkButton> {
        let base = &self.marketplace_base;
        vec![
            LinkButton {
                label: "View".to_string(),
                url: listing_url.to_string(),
            },
            LinkButton {
                label: "Send Message".to_string(),
                url: format!("{base}/items/{item_id}/want_it/new?button_name=receiver_id={item_id}"),
            },
            LinkButton {
                label: "Buy".to_string(),
                url: format!(
                    "{base}/transaction/buy/new?source_screen=item&transaction%5Bitem_id%5D={item_id}"
                ),
            },
        ]
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Share of positive feedback, 0-100, rounded half to even
pub fn reputation_percentage(feedback: &FeedbackCounts) -> f64 {
    let total = feedback.total();
    if total == 0 {
        return 0.0;
    }
    (feedback.positive as f64 * 100.0 / total as f64).round_ties_even()
}

/// 0-5 stars, one per 20% positive feedback
pub fn star_rating(feedback: &FeedbackCounts) -> String {
    let stars = (reputation_percentage(feedback) / 20.0).round_ties_even() as usize;
    STAR.repeat(stars.min(5))
}

/// Human readable age, e.g. "3 minutes ago"
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created_at).num_seconds().max(0);

    if seconds < 60 {
        return format!("{seconds} seconds ago");
    }

    let (count, unit) = match seconds {
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s => (s / 86_400, "day"),
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}

/// `£12.50` for pounds, `12.50EUR` for anything else
pub fn format_price(price: Option<f64>, currency: &str) -> String {
    match price {
        Some(amount) if currency == "GBP" => format!("£{amount:.2}"),
        Some(amount) => format!("{amount:.2}{currency}"),
        None => NOT_FOUND.to_string(),
    }
}
