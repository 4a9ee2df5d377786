use serde::{Deserialize, Serialize};

/// Search parameters for a catalog query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum price in `currency`
    pub price_to: u32,
    pub currency: String,
    /// Domain suffix of the marketplace site, e.g. `co.uk`
    pub country_domain: String,
    /// Sort order, newest first by default
    pub order: String,
    /// Number of listings per page
    pub per_page: u32,
    pub page: u32,
}

impl SearchParams {
    pub fn base_url(&self) -> String {
        format!("https://www.vinted.{}", self.country_domain)
    }

    /// Query string pairs for the catalog endpoint
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("order", self.order.clone()),
            ("price_to", self.price_to.to_string()),
            ("currency", self.currency.clone()),
            ("country_code", self.country_domain.clone()),
        ]
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            price_to: 200,
            currency: "GBP".to_string(),
            country_domain: "co.uk".to_string(),
            order: "newest_first".to_string(),
            per_page: 10,
            page: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_is_newest_first() {
        let params = SearchParams::default();
        let query = params.query();

        assert_eq!(params.base_url(), "https://www.vinted.co.uk");
        assert!(query.contains(&("order", "newest_first".to_string())));
        assert!(query.contains(&("price_to", "200".to_string())));
        assert!(query.contains(&("per_page", "10".to_string())));
        assert!(query.contains(&("country_code", "co.uk".to_string())));
    }
}
