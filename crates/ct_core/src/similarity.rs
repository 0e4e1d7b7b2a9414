use async_trait::async_trait;

use crate::Result;

/// Textual-similarity scoring between two article bodies. This talks to a
/// backend independent of the scraper API and must never block article
/// rendering.
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    /// Similarity ratio in `0.0..=1.0`.
    async fn similarity(&self, text1: &str, text2: &str) -> Result<f64>;
}
