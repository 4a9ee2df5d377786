use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::FeedbackCounts;

const UNKNOWN_ID: &str = "Unknown ID";
const NO_TITLE: &str = "No title provided";
const UNKNOWN_BRAND: &str = "Unknown brand";
const UNKNOWN_SIZE: &str = "Unknown size";
const UNKNOWN_STATUS: &str = "Unknown status";
const UNKNOWN_CURRENCY: &str = "Unknown currency";
const NO_PHOTO: &str = "No photo URL";
const NO_URL: &str = "No URL provided";
const NO_DESCRIPTION: &str = "No description provided";

/// One marketplace item, normalized from a raw search record
#[derive(Debug, Clone)]
pub struct Listing {
    /// Dedup key, stable across fetches of the same item
    pub id: String,
    pub title: String,
    pub brand_title: String,
    pub size_title: String,
    pub status: String,
    pub currency: String,
    pub price: Option<f64>,
    pub photo_url: String,
    pub url: String,
    pub description: String,
    /// Description from the enrichment source, preferred for display
    pub enriched_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub feedback: FeedbackCounts,
    pub owner_user_id: Option<String>,
}

impl Listing {
    /// Build a listing from a raw record. Never fails: anything missing or
    /// malformed degrades to a default.
    pub fn from_raw(data: &Value) -> Self {
        Self::from_raw_at(data, Utc::now())
    }

    /// Same as [`Listing::from_raw`], with `now` used as the timestamp of last resort.
    pub fn from_raw_at(data: &Value, now: DateTime<Utc>) -> Self {
        let id = data.get("id").and_then(id_string).unwrap_or_else(|| UNKNOWN_ID.to_string());

        let (price, price_currency) = extract_price(data.get("price"));
        let currency = string_field(data, "currency")
            .or(price_currency)
            .unwrap_or_else(|| UNKNOWN_CURRENCY.to_string());

        let user = data.get("user");
        let created_at = parse_timestamp(data).unwrap_or_else(|| {
            warn!("No valid timestamp found for item {}, using current time", id);
            now
        });

        let description = extract_description(data).unwrap_or_else(|| {
            warn!("No description found for item {}", id);
            NO_DESCRIPTION.to_string()
        });

        Self {
            title: string_field(data, "title").unwrap_or_else(|| NO_TITLE.to_string()),
            brand_title: string_field(data, "brand_title")
                .unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
            size_title: string_field(data, "size_title")
                .unwrap_or_else(|| UNKNOWN_SIZE.to_string()),
            status: string_field(data, "status").unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
            currency,
            price,
            photo_url: data
                .get("photo")
                .and_then(|p| string_field(p, "url"))
                .unwrap_or_else(|| NO_PHOTO.to_string()),
            url: string_field(data, "url").unwrap_or_else(|| NO_URL.to_string()),
            description,
            enriched_description: None,
            created_at,
            feedback: user.map(FeedbackCounts::from_object).unwrap_or_default(),
            owner_user_id: user.and_then(|u| u.get("id")).and_then(id_string),
            id,
        }
    }

    /// Attach a description fetched from the enrichment source. Blank values are ignored.
    pub fn set_enriched_description(&mut self, description: Option<String>) {
        if let Some(text) = description.filter(|d| !d.trim().is_empty()) {
            debug!("Using enriched description for item {}", self.id);
            self.enriched_description = Some(text);
        }
    }

    /// Best available description
    pub fn display_description(&self) -> &str {
        self.enriched_description.as_deref().unwrap_or(&self.description)
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Price may be a number, a numeric string or `{ "amount": "12.0", "currency_code": "GBP" }`.
fn extract_price(value: Option<&Value>) -> (Option<f64>, Option<String>) {
    match value {
        Some(Value::Number(n)) => (n.as_f64(), None),
        Some(Value::String(s)) => (s.trim().parse().ok(), None),
        Some(obj @ Value::Object(_)) => {
            let amount = match obj.get("amount") {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse().ok(),
                _ => None,
            };
            (amount, string_field(obj, "currency_code"))
        }
        _ => (None, None),
    }
}

fn extract_description(data: &Value) -> Option<String> {
    let mut candidates: Vec<&str> = Vec::new();

    if let Some(d) = data.get("description").and_then(Value::as_str) {
        candidates.push(d);
    }

    if let Some(d) = data.pointer("/item_box/description").and_then(Value::as_str) {
        candidates.push(d);
    }

    if let Some(d) = data
        .pointer("/props/pageProps/itemDto/description")
        .and_then(Value::as_str)
    {
        candidates.push(d);
    }

    if let Some(sections) = data.get("sections").and_then(Value::as_array) {
        for section in sections {
            if section.get("name").and_then(Value::as_str) != Some("description") {
                continue;
            }
            if let Some(d) = section.pointer("/data/description").and_then(Value::as_str) {
                if !d.is_empty() {
                    candidates.push(d);
                }
            }
        }
    }

    candidates
        .into_iter()
        .map(str::trim)
        .find(|d| !d.is_empty())
        .map(str::to_string)
}

/// Photo upload time first, then `created_at_ts`, then `last_loged_on_ts`.
fn parse_timestamp(data: &Value) -> Option<DateTime<Utc>> {
    if let Some(ts) = data.pointer("/photo/high_resolution/timestamp") {
        if let Some(parsed) = from_epoch_value(ts) {
            return Some(parsed);
        }
    }

    match data.get("created_at_ts") {
        Some(Value::String(s)) if !s.is_empty() => {
            if let Some(parsed) = parse_iso(s) {
                return Some(parsed);
            }
        }
        Some(ts @ Value::Number(_)) => {
            if let Some(parsed) = from_epoch_value(ts) {
                return Some(parsed);
            }
        }
        _ => {}
    }

    data.get("last_loged_on_ts")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .and_then(parse_iso)
}

fn from_epoch_value(value: &Value) -> Option<DateTime<Utc>> {
    let secs = value.as_f64().filter(|s| *s != 0.0 && s.is_finite())?;
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
    DateTime::from_timestamp(whole, nanos.min(999_999_999))
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = match raw.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => raw.to_string(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z") {
        return Some(parsed.with_timezone(&Utc));
    }

    // Offset-less timestamps are taken as UTC
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let listing = Listing::from_raw_at(&json!({}), fixed_now());

        assert_eq!(listing.id, UNKNOWN_ID);
        assert_eq!(listing.title, NO_TITLE);
        assert_eq!(listing.brand_title, UNKNOWN_BRAND);
        assert_eq!(listing.size_title, UNKNOWN_SIZE);
        assert_eq!(listing.status, UNKNOWN_STATUS);
        assert_eq!(listing.currency, UNKNOWN_CURRENCY);
        assert_eq!(listing.photo_url, NO_PHOTO);
        assert_eq!(listing.url, NO_URL);
        assert_eq!(listing.description, NO_DESCRIPTION);
        assert_eq!(listing.price, None);
        assert_eq!(listing.created_at, fixed_now());
        assert_eq!(listing.feedback, FeedbackCounts::default());
        assert!(listing.owner_user_id.is_none());
    }

    #[test]
    fn reads_typical_search_record() {
        let raw = json!({
            "id": 4211893012u64,
            "title": "Acne Studios scarf",
            "brand_title": "Acne Studios",
            "size_title": "One size",
            "status": "Very good",
            "price": { "amount": "45.0", "currency_code": "GBP" },
            "url": "https://www.vinted.co.uk/items/4211893012-acne-scarf",
            "photo": {
                "url": "https://images.vinted.net/t/abc.jpeg",
                "high_resolution": { "timestamp": 1714561200 }
            },
            "user": {
                "id": 99812,
                "positive_feedback_count": 31,
                "neutral_feedback_count": 2,
                "negative_feedback_count": 1
            }
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());

        assert_eq!(listing.id, "4211893012");
        assert_eq!(listing.price, Some(45.0));
        assert_eq!(listing.currency, "GBP");
        assert_eq!(listing.photo_url, "https://images.vinted.net/t/abc.jpeg");
        assert_eq!(listing.owner_user_id.as_deref(), Some("99812"));
        assert_eq!(listing.feedback.total(), 34);
        assert_eq!(listing.created_at, Utc.timestamp_opt(1714561200, 0).unwrap());
    }

    #[test]
    fn top_level_description_wins_over_sections() {
        let raw = json!({
            "description": "  flat description  ",
            "sections": [{ "name": "description", "data": { "description": "from sections" } }]
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.description, "flat description");
    }

    #[test]
    fn sections_description_used_when_alone() {
        let raw = json!({
            "sections": [
                { "name": "details", "data": { "description": "wrong section" } },
                { "name": "description", "data": { "description": "from sections" } }
            ]
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.description, "from sections");
    }

    #[test]
    fn blank_candidates_are_skipped_in_order() {
        let raw = json!({
            "description": "   ",
            "item_box": { "description": "" },
            "props": { "pageProps": { "itemDto": { "description": "from page props" } } },
            "sections": [{ "name": "description", "data": { "description": "from sections" } }]
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.description, "from page props");
    }

    #[test]
    fn item_box_precedes_page_props() {
        let raw = json!({
            "item_box": { "description": "from item box" },
            "props": { "pageProps": { "itemDto": { "description": "from page props" } } }
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.description, "from item box");
    }

    #[test]
    fn photo_timestamp_takes_priority() {
        let raw = json!({
            "photo": { "high_resolution": { "timestamp": 1700000000 } },
            "created_at_ts": "2020-01-01T00:00:00Z"
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.created_at, Utc.timestamp_opt(1700000000, 0).unwrap());
    }

    #[test]
    fn iso_created_at_with_trailing_z() {
        let raw = json!({ "created_at_ts": "2024-04-30T08:15:00Z" });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(
            listing.created_at,
            Utc.with_ymd_and_hms(2024, 4, 30, 8, 15, 0).unwrap()
        );
    }

    #[test]
    fn numeric_created_at_is_epoch_seconds() {
        let raw = json!({ "created_at_ts": 1714550000 });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.created_at, Utc.timestamp_opt(1714550000, 0).unwrap());
    }

    #[test]
    fn unparseable_created_at_falls_through_to_last_logged_on() {
        let raw = json!({
            "created_at_ts": "yesterday-ish",
            "last_loged_on_ts": "2024-04-29T10:00:00+02:00"
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(
            listing.created_at,
            Utc.with_ymd_and_hms(2024, 4, 29, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn garbage_timestamps_fall_back_to_now() {
        let raw = json!({
            "photo": { "high_resolution": { "timestamp": "soon" } },
            "created_at_ts": { "nested": true },
            "last_loged_on_ts": "not a date"
        });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.created_at, fixed_now());
    }

    #[test]
    fn enriched_description_supersedes_own() {
        let mut listing = Listing::from_raw_at(&json!({ "description": "own" }), fixed_now());
        assert_eq!(listing.display_description(), "own");

        listing.set_enriched_description(Some("   ".to_string()));
        assert_eq!(listing.display_description(), "own");

        listing.set_enriched_description(Some("enriched".to_string()));
        assert_eq!(listing.display_description(), "enriched");
    }

    #[test]
    fn string_ids_are_kept() {
        let raw = json!({ "id": "abc-1", "user": { "id": "u-7" } });

        let listing = Listing::from_raw_at(&raw, fixed_now());
        assert_eq!(listing.id, "abc-1");
        assert_eq!(listing.owner_user_id.as_deref(), Some("u-7"));
    }
}
