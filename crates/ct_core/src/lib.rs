pub mod config;
pub mod error;
pub mod gateway;
pub mod parsing;
pub mod similarity;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, RequestError};
pub use gateway::ArticleGateway;
pub use similarity::SimilarityScorer;
pub use storage::StateStorage;
pub use types::{Article, ArticleSummary, Author, BlockTag, BodyBlock, SourceResult};

pub type Result<T> = std::result::Result<T, Error>;

/// Result type carried across the request boundary: callers always branch
/// on a normalized error, nothing network-shaped is thrown past here.
pub type RequestResult<T> = std::result::Result<T, RequestError>;

pub mod prelude {
    pub use super::{
        Article, ArticleGateway, ArticleSummary, Author, Error, RequestError, RequestResult,
        Result, SimilarityScorer, SourceResult, StateStorage,
    };
}
