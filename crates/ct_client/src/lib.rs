pub mod cache;
pub mod scraper;

pub use cache::{CacheKey, CacheSubscription, RequestCache};
pub use scraper::{CachedScraperClient, ScraperClient};

pub mod prelude {
    pub use super::{CacheKey, CachedScraperClient, RequestCache, ScraperClient};
    pub use ct_core::{ArticleGateway, RequestError, RequestResult};
}
