use std::fmt;

use async_trait::async_trait;
use ct_core::{Config, Error, Result, SimilarityScorer};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

/// Client for the Dandelion text-similarity API. Talks to a backend
/// independent of the scraper; failures here never affect comparison
/// state, they only surface a dismissible banner.
pub struct DandelionClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
    lang: String,
}

impl DandelionClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Similarity(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: config.similarity_url.clone(),
            token: config.similarity_token.clone(),
            lang: config.similarity_lang.clone(),
        })
    }
}

impl fmt::Debug for DandelionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DandelionClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"<redacted>")
            .field("lang", &self.lang)
            .finish()
    }
}

#[derive(Serialize)]
struct SimilarityForm<'a> {
    text1: &'a str,
    text2: &'a str,
    token: &'a str,
    lang: &'a str,
    bow: &'static str,
}

#[derive(Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

#[derive(Deserialize)]
struct SimilarityError {
    message: String,
}

#[async_trait]
impl SimilarityScorer for DandelionClient {
    async fn similarity(&self, text1: &str, text2: &str) -> Result<f64> {
        let form = SimilarityForm {
            text1,
            text2,
            token: &self.token,
            lang: &self.lang,
            bow: "never",
        };
        info!("submitting similarity request to {}", self.endpoint);

        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Similarity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<SimilarityError>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("similarity request failed with status {}", status));
            return Err(Error::Similarity(message));
        }

        let parsed = response
            .json::<SimilarityResponse>()
            .await
            .map_err(|e| Error::Similarity(e.to_string()))?;
        Ok(parsed.similarity)
    }
}
