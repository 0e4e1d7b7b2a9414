pub mod compare_session;
mod logging;
pub mod search_session;

pub use compare_session::{
    ArticleToCompare, CompareEvent, CompareSession, SimilarityStatus, SELECTOR_PROMPT_DELAY,
};
pub use logging::init_logging;
pub use search_session::{LoadKind, SearchSession, SearchStatus};

pub mod prelude {
    pub use super::{CompareEvent, CompareSession, SearchSession, SearchStatus, SimilarityStatus};
    pub use ct_core::{Article, ArticleGateway, ArticleSummary, Result, SimilarityScorer};
    pub use ct_store::{Slot, Store};
}
