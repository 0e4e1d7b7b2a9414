use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ct_core::parsing::parse_date_time;
use ct_core::{
    Article, ArticleGateway, ArticleSummary, Config, RequestError, RequestResult, SourceResult,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::cache::{CacheKey, RequestCache};

pub const SEARCH_ENDPOINT: &str = "search_articles";
pub const GET_ARTICLE_ENDPOINT: &str = "get_article";

/// Raw HTTP client for the scraping backend. Returns untyped payloads so
/// the request cache can hold one value shape for every endpoint; typing
/// happens in [`CachedScraperClient`].
pub struct ScraperClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ScraperClient {
    pub fn new(config: &Config) -> RequestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|_| RequestError::Setup)?;
        Ok(Self {
            http,
            base_url: config.scraper_url.clone(),
        })
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> RequestResult<Value> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|_| RequestError::Setup)?;
        info!("fetching {} {:?}", url, params);

        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let data = response.json::<Value>().await.unwrap_or(Value::Null);
            warn!("request failed with status {}", status);
            return Err(RequestError::Http {
                status: status.as_u16(),
                data,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(classify_transport_error)
    }

    pub async fn search_articles_raw(
        &self,
        topic: &str,
        page: u32,
        limit: u32,
    ) -> RequestResult<Value> {
        self.get_json(
            SEARCH_ENDPOINT,
            &[
                ("topic", topic.to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn get_article_raw(&self, article_url: &str) -> RequestResult<Value> {
        self.get_json(GET_ARTICLE_ENDPOINT, &[("url", article_url.to_string())])
            .await
    }
}

/// Maps reqwest failures onto the normalized taxonomy. Malformed bodies
/// count as client-side failures: the server answered, we could not use it.
fn classify_transport_error(error: reqwest::Error) -> RequestError {
    if error.is_timeout() {
        RequestError::Timeout
    } else if error.is_builder() {
        RequestError::Setup
    } else if error.is_connect() || error.is_request() {
        RequestError::NoResponse
    } else {
        RequestError::Setup
    }
}

/// The two historical wire shapes of one search-page entry: the current
/// per-scraper record, and a legacy bare error map keyed by scraper name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSearchEntry {
    PerScraper {
        scraper: String,
        results: WireOutcome,
    },
    LegacyErrorMap {
        error: BTreeMap<String, String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireOutcome {
    Summaries(Vec<ArticleSummary>),
    Error(BTreeMap<String, String>),
}

/// Normalizes a raw `search_articles` payload into per-source results,
/// supporting both wire shapes, and rewrites summary timestamps into
/// display strings. This is the only place the legacy shape is visible.
pub fn normalize_search_results(value: Value) -> RequestResult<Vec<SourceResult>> {
    let entries: Vec<WireSearchEntry> =
        serde_json::from_value(value).map_err(|_| RequestError::Setup)?;

    let mut normalized = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            WireSearchEntry::PerScraper { scraper, results } => match results {
                WireOutcome::Summaries(mut summaries) => {
                    for summary in &mut summaries {
                        summary.date_time = parse_date_time(&summary.date_time);
                    }
                    normalized.push(SourceResult {
                        scraper,
                        outcome: Ok(summaries),
                    });
                }
                WireOutcome::Error(map) => {
                    let message = map
                        .get("error")
                        .cloned()
                        .or_else(|| map.values().next().cloned())
                        .unwrap_or_else(|| "unknown scraper error".to_string());
                    normalized.push(SourceResult {
                        scraper,
                        outcome: Err(message),
                    });
                }
            },
            WireSearchEntry::LegacyErrorMap { error } => {
                for (scraper, message) in error {
                    normalized.push(SourceResult {
                        scraper,
                        outcome: Err(message),
                    });
                }
            }
        }
    }
    Ok(normalized)
}

fn parse_article(value: Value) -> RequestResult<Article> {
    serde_json::from_value(value).map_err(|_| RequestError::Setup)
}

/// [`ArticleGateway`] over HTTP, with every call routed through the
/// request cache. Both call sites skip the completed-entry short circuit:
/// search pages are distinct keys anyway, and full articles live in the
/// session-local cache. Deduplication of concurrent identical requests
/// still applies.
pub struct CachedScraperClient {
    client: Arc<ScraperClient>,
    cache: Arc<RequestCache>,
}

impl CachedScraperClient {
    pub fn new(client: ScraperClient, cache: Arc<RequestCache>) -> Self {
        Self {
            client: Arc::new(client),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<RequestCache> {
        &self.cache
    }

    pub fn search_key(topic: &str, page: u32, limit: u32) -> CacheKey {
        CacheKey::new(
            SEARCH_ENDPOINT,
            &[
                ("topic", topic),
                ("page", &page.to_string()),
                ("limit", &limit.to_string()),
            ],
        )
    }

    pub fn article_key(article_url: &str) -> CacheKey {
        CacheKey::new(GET_ARTICLE_ENDPOINT, &[("url", article_url)])
    }
}

#[async_trait]
impl ArticleGateway for CachedScraperClient {
    async fn search_articles(
        &self,
        topic: &str,
        page: u32,
        limit: u32,
    ) -> RequestResult<Vec<SourceResult>> {
        let key = Self::search_key(topic, page, limit);
        let client = Arc::clone(&self.client);
        let value = self
            .cache
            .query(key, true, || async move {
                client.search_articles_raw(topic, page, limit).await
            })
            .await?;
        normalize_search_results(value)
    }

    async fn get_article(&self, article_url: &str) -> RequestResult<Article> {
        let key = Self::article_key(article_url);
        let client = Arc::clone(&self.client);
        let value = self
            .cache
            .query(key, true, || async move {
                client.get_article_raw(article_url).await
            })
            .await?;
        parse_article(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_current_shape_and_display_dates() {
        let payload = json!([
            {
                "scraper": "el-pais",
                "results": [
                    {
                        "newspaper": "El País",
                        "authors": [{"name": "Test Author0", "url": "https://elpais.com/a0"}],
                        "title": "Test title0",
                        "excerpt": "This is a test excerpt0",
                        "date_time": "2023-10-30T15:31:48Z",
                        "url": "https://elpais.com/t0",
                        "is_premium": false
                    }
                ]
            }
        ]);

        let results = normalize_search_results(payload).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scraper, "el-pais");
        let summaries = results[0].outcome.as_ref().unwrap();
        assert_eq!(summaries[0].title, "Test title0");
        assert_eq!(summaries[0].date_time, "30/10/2023, 15:31:48");
    }

    #[test]
    fn normalizes_per_scraper_error_shape() {
        let payload = json!([
            {"scraper": "el-mundo", "results": {"error": "parsing error"}}
        ]);
        let results = normalize_search_results(payload).unwrap();
        assert_eq!(results[0].scraper, "el-mundo");
        assert_eq!(results[0].outcome, Err("parsing error".to_string()));
    }

    #[test]
    fn normalizes_legacy_error_map_shape() {
        let payload = json!([
            {"error": {"el-pais": "test error"}}
        ]);
        let results = normalize_search_results(payload).unwrap();
        assert_eq!(results[0].scraper, "el-pais");
        assert_eq!(results[0].outcome, Err("test error".to_string()));
    }

    #[test]
    fn mixed_page_keeps_successes_and_errors_apart() {
        let payload = json!([
            {"scraper": "el-pais", "results": []},
            {"scraper": "abc", "results": {"error": "scraper down"}}
        ]);
        let results = normalize_search_results(payload).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].outcome.is_ok());
        assert!(results[1].outcome.is_err());
    }

    #[test]
    fn garbage_payload_is_a_client_side_failure() {
        let result = normalize_search_results(json!({"not": "an array"}));
        assert_eq!(result.unwrap_err(), RequestError::Setup);
    }
}
