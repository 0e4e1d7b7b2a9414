use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ct_core::{Article, ArticleGateway, ArticleSummary, RequestError, SimilarityScorer};
use ct_store::{CartAction, CompareAction, Slot, Store};
use tracing::{debug, warn};

/// Pause before prompting for the first selection after a session reset,
/// so the selector does not flicker open mid-transition.
pub const SELECTOR_PROMPT_DELAY: Duration = Duration::from_millis(300);

/// A fetched article pinned to its comparison slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleToCompare {
    pub article: Article,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimilarityStatus {
    Idle,
    Loading,
    /// Similarity as a percentage.
    Ready(f64),
    /// Dismissible; never affects comparison state.
    Failed,
}

/// What the UI should do after the session reacted to a selection change.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareEvent {
    /// Nothing is selected; open the selector for this slot.
    PromptSelection(Slot),
    /// The slot's article is in the display list.
    ArticleReady(Slot),
    /// The fetch failed; open the error-recovery modal (retry / remove).
    FetchFailed(Slot, RequestError),
    /// A response for a superseded selection was dropped.
    Stale,
    /// There was no current selection to act on.
    Idle,
}

struct SessionState {
    /// Bumped on every reset; async results carrying an older generation
    /// are discarded instead of merged.
    generation: u64,
    /// Session-local full-article cache, append-only until reset.
    article_cache: HashMap<String, Article>,
    articles: Vec<ArticleToCompare>,
    slot_errors: [Option<RequestError>; 2],
    loading: [bool; 2],
    similarity: SimilarityStatus,
}

impl SessionState {
    fn new() -> Self {
        Self {
            generation: 0,
            article_cache: HashMap::new(),
            articles: Vec::new(),
            slot_errors: [None, None],
            loading: [false, false],
            similarity: SimilarityStatus::Idle,
        }
    }

    fn merge(&mut self, entry: ArticleToCompare) {
        self.articles.retain(|a| a.slot != entry.slot);
        self.articles.push(entry);
    }
}

/// Drives the comparison workflow: watches the store's current selection,
/// resolves the full article through a three-tier lookup (session cache →
/// gateway → error state), and owns the derived comparison data.
///
/// The store and gateway are only ever touched from async context on one
/// runtime; the inner mutex is held between suspension points, never
/// across them.
pub struct CompareSession {
    store: Arc<Store>,
    gateway: Arc<dyn ArticleGateway>,
    scorer: Arc<dyn SimilarityScorer>,
    inner: Mutex<SessionState>,
}

impl CompareSession {
    pub fn new(
        store: Arc<Store>,
        gateway: Arc<dyn ArticleGateway>,
        scorer: Arc<dyn SimilarityScorer>,
    ) -> Self {
        Self {
            store,
            gateway,
            scorer,
            inner: Mutex::new(SessionState::new()),
        }
    }

    /// Starts a fresh comparison session: clears the compare slice and all
    /// session-local data. In-flight fetches from the previous session are
    /// invalidated by the generation bump.
    pub fn reset(&self) {
        self.store.dispatch(CompareAction::Clear);
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.article_cache.clear();
        inner.articles.clear();
        inner.slot_errors = [None, None];
        inner.loading = [false, false];
        inner.similarity = SimilarityStatus::Idle;
    }

    /// Marks the slot the next selection will fill.
    pub fn set_active_slot(&self, slot: Slot) {
        self.store.dispatch(CompareAction::SetActiveSlot(slot));
    }

    /// Puts `summary` into the active slot (also adding it to the cart)
    /// and resolves its article. The cart reducer enforces uniqueness, so
    /// the add needs no membership check here.
    pub async fn select_article(&self, summary: ArticleSummary) -> CompareEvent {
        self.store.dispatch(CartAction::Add(summary.clone()));
        self.store.dispatch(CompareAction::SelectForSlot(summary));
        self.sync_selection().await
    }

    /// Reacts to the latest selection change. With no selections at all,
    /// waits out the prompt delay and asks for slot 0 to be filled;
    /// otherwise ensures the current selection's article is available.
    pub async fn sync_selection(&self) -> CompareEvent {
        let compare = self.store.state().compare;
        if compare.is_empty() {
            tokio::time::sleep(SELECTOR_PROMPT_DELAY).await;
            return CompareEvent::PromptSelection(Slot::Left);
        }
        let Some(selection) = compare.current else {
            return CompareEvent::Idle;
        };

        let slot = selection.slot;
        let url = selection.summary.url.clone();

        let generation = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(article) = inner.article_cache.get(&url).cloned() {
                debug!("article cache hit for {}", url);
                inner.merge(ArticleToCompare { article, slot });
                inner.slot_errors[slot.index()] = None;
                return CompareEvent::ArticleReady(slot);
            }
            inner.loading[slot.index()] = true;
            inner.generation
        };

        let result = self.gateway.get_article(&url).await;

        // Apply only if this selection is still the one on display: the
        // session may have been reset or the slot reassigned while the
        // request was in flight.
        let still_current = self
            .store
            .state()
            .compare
            .selection_for(slot)
            .is_some_and(|sel| sel.summary.url == url);

        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation || !still_current {
            debug!("dropping stale article response for {}", url);
            return CompareEvent::Stale;
        }
        inner.loading[slot.index()] = false;

        match result {
            Ok(article) => {
                inner.article_cache.insert(url, article.clone());
                inner.merge(ArticleToCompare { article, slot });
                inner.slot_errors[slot.index()] = None;
                CompareEvent::ArticleReady(slot)
            }
            Err(e) => {
                warn!("get_article failed for {}: {}", url, e);
                inner.slot_errors[slot.index()] = Some(e.clone());
                CompareEvent::FetchFailed(slot, e)
            }
        }
    }

    /// Error-modal "retry": re-resolves the same current selection.
    pub async fn retry(&self) -> CompareEvent {
        self.sync_selection().await
    }

    /// Error-modal "remove", and the card close button: evicts the slot's
    /// selection from the compare slice *and* its summary from the cart —
    /// a persistently failing url is assumed unusable.
    pub fn remove(&self, slot: Slot) {
        if let Some(selection) = self.store.state().compare.selection_for(slot) {
            self.store
                .dispatch(CartAction::Remove(selection.summary.url.clone()));
        }
        self.store.dispatch(CompareAction::RemoveFromSlot(slot));

        let mut inner = self.inner.lock().unwrap();
        inner.articles.retain(|a| a.slot != slot);
        inner.slot_errors[slot.index()] = None;
        inner.loading[slot.index()] = false;
        inner.similarity = SimilarityStatus::Idle;
    }

    /// Swaps the two display slots. Pure local transform, no refetch.
    pub fn switch(&self) {
        let mut inner = self.inner.lock().unwrap();
        for entry in &mut inner.articles {
            entry.slot = entry.slot.other();
        }
    }

    /// Submits both article bodies to the similarity backend. Requires
    /// both slots filled; the result is a percentage. Runs independently
    /// of article fetching and never blocks rendering.
    pub async fn compute_similarity(&self) -> SimilarityStatus {
        let (text1, text2, generation) = {
            let mut inner = self.inner.lock().unwrap();
            let left = inner.articles.iter().find(|a| a.slot == Slot::Left);
            let right = inner.articles.iter().find(|a| a.slot == Slot::Right);
            let (Some(left), Some(right)) = (left, right) else {
                return inner.similarity.clone();
            };
            let texts = (left.article.plain_text(), right.article.plain_text());
            inner.similarity = SimilarityStatus::Loading;
            (texts.0, texts.1, inner.generation)
        };

        let result = self.scorer.similarity(&text1, &text2).await;

        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation {
            return inner.similarity.clone();
        }
        inner.similarity = match result {
            Ok(ratio) => SimilarityStatus::Ready(ratio * 100.0),
            Err(e) => {
                warn!("similarity request failed: {}", e);
                SimilarityStatus::Failed
            }
        };
        inner.similarity.clone()
    }

    pub fn dismiss_similarity(&self) {
        self.inner.lock().unwrap().similarity = SimilarityStatus::Idle;
    }

    /// Current display list, left slot first.
    pub fn articles(&self) -> Vec<ArticleToCompare> {
        let mut articles = self.inner.lock().unwrap().articles.clone();
        articles.sort_by_key(|a| a.slot.index());
        articles
    }

    pub fn similarity(&self) -> SimilarityStatus {
        self.inner.lock().unwrap().similarity.clone()
    }

    pub fn slot_error(&self, slot: Slot) -> Option<RequestError> {
        self.inner.lock().unwrap().slot_errors[slot.index()].clone()
    }

    pub fn is_loading(&self, slot: Slot) -> bool {
        self.inner.lock().unwrap().loading[slot.index()]
    }
}
