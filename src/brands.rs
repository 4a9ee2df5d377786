use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::BrandChannels;
use crate::models::Route;

/// Multi-word brands that may match anywhere inside a brand title.
/// Closed list; wider substring matching would trade precision for recall.
const SUBSTRING_BRANDS: [&str; 8] = [
    "cole buxton",
    "acne studios",
    "our legacy",
    "canada goose",
    "palace",
    "bape",
    "clints",
    "stussy",
];

/// Lowercased alias to route lookup
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    routes: HashMap<String, Route>,
    /// Aliases in the order they were first registered
    order: Vec<String>,
}

impl AliasIndex {
    /// Register every alias of every brand. A repeated alias keeps the last brand.
    pub fn build(channels: &BrandChannels) -> Self {
        let mut routes: HashMap<String, Route> = HashMap::new();
        let mut order = Vec::new();

        for entry in &channels.entries {
            for alias in &entry.aliases {
                let key = alias.to_lowercase();
                let route = Route {
                    main_brand: entry.name.clone(),
                    channel_id: entry.channel_id,
                };
                match routes.insert(key.clone(), route) {
                    None => order.push(key),
                    Some(previous) if previous.main_brand != entry.name => warn!(
                        "Alias '{}' is listed under both '{}' and '{}', using '{}'",
                        alias, previous.main_brand, entry.name, entry.name
                    ),
                    Some(_) => {}
                }
            }
        }

        Self { routes, order }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for a free-text brand title.
    ///
    /// Checks run cheapest and most precise first: exact alias, then simple
    /// spelling variants. After that each alias is tried in registration order,
    /// either as one part of a collaboration title (`"a x b"`) or, for a fixed
    /// list of brand names, as a substring. The first alias that fits wins.
    pub fn resolve(&self, brand_title: &str) -> Option<&Route> {
        let brand = brand_title.trim().to_lowercase();
        if brand.is_empty() {
            return None;
        }

        if let Some(route) = self.routes.get(&brand) {
            return Some(route);
        }

        let variants = [
            brand.replace(' ', ""),
            brand.replace('ü', "u"),
            brand.replace('-', " "),
            brand.replace('.', ""),
        ];
        if let Some(route) = variants.iter().find_map(|v| self.routes.get(v)) {
            return Some(route);
        }

        let parts: Vec<&str> = if brand.contains(" x ") {
            brand.split(" x ").map(str::trim).collect()
        } else {
            Vec::new()
        };
        let matched = self.order.iter().find(|alias| {
            parts.contains(&alias.as_str())
                || (SUBSTRING_BRANDS.contains(&alias.as_str()) && brand.contains(alias.as_str()))
        });
        if let Some(route) = matched.and_then(|alias| self.routes.get(alias)) {
            return Some(route);
        }

        debug!("No brand match found for: {} (normalized: {})", brand_title, brand);
        None
    }
}
