use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use ct_core::{ArticleGateway, ArticleSummary, RequestError};
use ct_store::{SearchAction, Store};
use tracing::{debug, info, warn};

/// Whether a load was the first page of a topic or a "show more" append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Initial,
    More,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    Idle,
    Loading(LoadKind),
    Ready,
    /// The page loaded but no source returned any summary.
    NoResults,
    /// The request itself failed; already-accumulated results are kept.
    Failed(RequestError),
}

struct SessionState {
    generation: u64,
    topic: String,
    page: u32,
    limit: u32,
    summaries: Vec<ArticleSummary>,
    /// Latest failure message per scraper, replaced on repeat failure and
    /// cleared when that scraper succeeds again.
    scraper_errors: BTreeMap<String, String>,
    status: SearchStatus,
    loaded_any_page: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            generation: 0,
            topic: String::new(),
            page: 0,
            limit: 0,
            summaries: Vec::new(),
            scraper_errors: BTreeMap::new(),
            status: SearchStatus::Idle,
            loaded_any_page: false,
        }
    }
}

/// Paginated search over the scraper gateway. Results accumulate across
/// "show more" loads; per-scraper failures are surfaced next to the
/// results they did not contribute to instead of failing the page.
pub struct SearchSession {
    store: Arc<Store>,
    gateway: Arc<dyn ArticleGateway>,
    inner: Mutex<SessionState>,
}

impl SearchSession {
    pub fn new(store: Arc<Store>, gateway: Arc<dyn ArticleGateway>) -> Self {
        Self {
            store,
            gateway,
            inner: Mutex::new(SessionState::new()),
        }
    }

    /// Starts a new search: clears accumulated results and loads page zero.
    /// The topic is only recorded in the store once a page actually loads.
    pub async fn search(&self, topic: &str, limit: u32) -> SearchStatus {
        info!("searching for {:?}", topic);
        let generation = {
            let mut inner = self.inner.lock().unwrap();
            inner.generation += 1;
            inner.topic = topic.to_string();
            inner.page = 0;
            inner.limit = limit;
            inner.summaries.clear();
            inner.scraper_errors.clear();
            inner.loaded_any_page = false;
            inner.status = SearchStatus::Loading(LoadKind::Initial);
            inner.generation
        };
        self.fetch_page(generation, topic.to_string(), 0, limit)
            .await
    }

    /// Loads the next page of the current topic, appending to the
    /// accumulated results. A page that failed to load is re-requested
    /// rather than skipped, so no page is ever silently lost.
    pub async fn show_more(&self) -> SearchStatus {
        let (generation, topic, page, limit) = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.loaded_any_page {
                return inner.status.clone();
            }
            if !matches!(inner.status, SearchStatus::Failed(_)) {
                inner.page += 1;
            }
            inner.status = SearchStatus::Loading(LoadKind::More);
            (
                inner.generation,
                inner.topic.clone(),
                inner.page,
                inner.limit,
            )
        };
        self.fetch_page(generation, topic, page, limit).await
    }

    /// Re-requests the page that last failed, without advancing.
    pub async fn retry(&self) -> SearchStatus {
        let (generation, topic, page, limit) = {
            let mut inner = self.inner.lock().unwrap();
            let kind = if inner.loaded_any_page {
                LoadKind::More
            } else {
                LoadKind::Initial
            };
            inner.status = SearchStatus::Loading(kind);
            (
                inner.generation,
                inner.topic.clone(),
                inner.page,
                inner.limit,
            )
        };
        self.fetch_page(generation, topic, page, limit).await
    }

    async fn fetch_page(
        &self,
        generation: u64,
        topic: String,
        page: u32,
        limit: u32,
    ) -> SearchStatus {
        let result = self.gateway.search_articles(&topic, page, limit).await;

        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation {
            debug!("dropping stale search page for {:?}", topic);
            return inner.status.clone();
        }

        match result {
            Ok(sources) => {
                for source in sources {
                    match source.outcome {
                        Ok(summaries) => {
                            inner.scraper_errors.remove(&source.scraper);
                            inner.summaries.extend(summaries);
                        }
                        Err(message) => {
                            warn!("scraper {} failed: {}", source.scraper, message);
                            inner.scraper_errors.insert(source.scraper, message);
                        }
                    }
                }
                inner.loaded_any_page = true;
                inner.status = if inner.summaries.is_empty() {
                    SearchStatus::NoResults
                } else {
                    SearchStatus::Ready
                };
                self.store.dispatch(SearchAction::UpdateTopic(topic));
            }
            Err(e) => {
                warn!("search request failed: {}", e);
                inner.status = SearchStatus::Failed(e);
            }
        }
        inner.status.clone()
    }

    /// Accumulated summaries, in arrival order.
    pub fn summaries(&self) -> Vec<ArticleSummary> {
        self.inner.lock().unwrap().summaries.clone()
    }

    pub fn scraper_errors(&self) -> BTreeMap<String, String> {
        self.inner.lock().unwrap().scraper_errors.clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.inner.lock().unwrap().status.clone()
    }

    /// More pages can be requested once the first one has loaded; the
    /// backend signals exhaustion with an empty page, not an error.
    pub fn can_show_more(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.loaded_any_page && !matches!(inner.status, SearchStatus::Loading(_))
    }

    pub fn dismiss_scraper_errors(&self) {
        self.inner.lock().unwrap().scraper_errors.clear();
    }
}
