pub mod traits;
pub mod types;
pub mod vinted;

pub use traits::ScraperTrait;
pub use types::SearchParams;
pub use vinted::VintedScraper;
