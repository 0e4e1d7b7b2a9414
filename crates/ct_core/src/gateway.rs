use async_trait::async_trait;

use crate::types::{Article, SourceResult};
use crate::RequestResult;

/// Seam between the sessions and the article-search backend. The real
/// implementation wraps HTTP calls in the request cache; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait ArticleGateway: Send + Sync {
    /// One page of per-scraper search results for a topic. Pages are
    /// zero-based; the backend gives no end-of-results signal.
    async fn search_articles(
        &self,
        topic: &str,
        page: u32,
        limit: u32,
    ) -> RequestResult<Vec<SourceResult>>;

    /// The full body of a single article.
    async fn get_article(&self, url: &str) -> RequestResult<Article>;
}
