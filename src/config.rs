use std::fmt;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::scrapers::types::SearchParams;

/// Runtime settings, from flags or environment
#[derive(Debug, Clone, Parser)]
#[command(name = "vinted-scout", about = "Watches Vinted for new listings of configured brands")]
pub struct Settings {
    /// Brand to channel mapping file
    #[arg(long, env = "BRANDS_FILE", default_value = "brand_channels.json")]
    pub brands: PathBuf,

    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: String,

    #[arg(long, env = "RAPIDAPI_KEY", hide_env_values = true)]
    pub rapidapi_key: String,

    #[arg(long, env = "RAPIDAPI_HOST", default_value = "vinted6.p.rapidapi.com")]
    pub rapidapi_host: String,

    /// Country passed to the enrichment endpoints
    #[arg(long, default_value = "gb")]
    pub enrichment_country: String,

    /// Highest price to search for
    #[arg(long, default_value_t = 200)]
    pub price_to: u32,

    #[arg(long, default_value = "GBP")]
    pub currency: String,

    /// Vinted domain suffix, e.g. `co.uk` for www.vinted.co.uk
    #[arg(long, default_value = "co.uk")]
    pub country_domain: String,

    #[arg(long, default_value_t = 10)]
    pub per_page: u32,

    /// Seconds between searches
    #[arg(long, default_value_t = 10)]
    pub poll_secs: u64,

    /// Seconds between "time uploaded" refreshes of a sent message
    #[arg(long, default_value_t = 60)]
    pub update_secs: u64,

    /// Forget the oldest sent ids past this many; unbounded when unset
    #[arg(long)]
    pub sent_capacity: Option<usize>,
}

impl Settings {
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            price_to: self.price_to,
            currency: self.currency.clone(),
            country_domain: self.country_domain.clone(),
            per_page: self.per_page,
            ..SearchParams::default()
        }
    }

    pub fn marketplace_base(&self) -> String {
        format!("https://www.vinted.{}", self.country_domain)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One configured brand
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BrandEntry {
    #[serde(skip)]
    pub name: String,
    #[serde(deserialize_with = "channel_id")]
    pub channel_id: u64,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Brands in the order they appear in the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandChannels {
    pub entries: Vec<BrandEntry>,
}

#[derive(Debug, Deserialize)]
struct BrandFile {
    #[serde(default)]
    channel_mappings: BrandChannels,
}

impl BrandChannels {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: BrandFile = serde_json::from_str(raw)?;
        Ok(file.channel_mappings)
    }

    /// Read the mapping file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the mapping file, degrading to an empty mapping on any error
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(channels) => {
                info!("Loaded {} brands from {}", channels.entries.len(), path.display());
                channels
            }
            Err(e) => {
                error!("Error loading brand channels: {e}");
                Self::default()
            }
        }
    }
}

impl<'de> Deserialize<'de> for BrandChannels {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = BrandChannels;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of brand name to channel mapping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, mut entry)) = map.next_entry::<String, BrandEntry>()? {
                    entry.name = name;
                    entries.push(entry);
                }
                Ok(BrandChannels { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Channel ids show up both as JSON numbers and as strings
fn channel_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid channel id '{s}'"))),
    }
}
