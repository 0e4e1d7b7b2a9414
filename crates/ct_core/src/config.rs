use std::env;
use std::time::Duration;

use url::Url;

use crate::{Error, Result};

/// Similarity endpoint used when `COMPARE_API_URL` is unset.
pub const DEFAULT_SIMILARITY_URL: &str = "https://api.dandelion.eu/datatxt/sim/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the article-scraping backend.
    pub scraper_url: Url,
    /// Deadline applied to every scraper request.
    pub request_timeout: Duration,
    /// Third-party similarity endpoint.
    pub similarity_url: Url,
    /// Bearer token for the similarity endpoint.
    pub similarity_token: String,
    /// Language hint submitted with similarity requests.
    pub similarity_lang: String,
}

impl Config {
    /// Reads `SCRAPER_URL` (required), `SCRAPER_TIMEOUT_SECS`,
    /// `COMPARE_API_URL` and `COMPARE_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let scraper_url = env::var("SCRAPER_URL")
            .map_err(|_| Error::Config("SCRAPER_URL is not set".to_string()))?;
        let timeout = match env::var("SCRAPER_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("invalid SCRAPER_TIMEOUT_SECS: {}", raw)))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        let similarity_url = env::var("COMPARE_API_URL")
            .unwrap_or_else(|_| DEFAULT_SIMILARITY_URL.to_string());

        Self::new(
            &scraper_url,
            Duration::from_secs(timeout),
            &similarity_url,
            env::var("COMPARE_API_TOKEN").unwrap_or_default(),
        )
    }

    pub fn new(
        scraper_url: &str,
        request_timeout: Duration,
        similarity_url: &str,
        similarity_token: String,
    ) -> Result<Self> {
        let scraper_url = Url::parse(scraper_url)
            .map_err(|e| Error::Config(format!("invalid scraper url: {}", e)))?;
        let similarity_url = Url::parse(similarity_url)
            .map_err(|e| Error::Config(format!("invalid similarity url: {}", e)))?;

        Ok(Self {
            scraper_url,
            request_timeout,
            similarity_url,
            similarity_token,
            similarity_lang: "es".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_explicit_values() {
        let config = Config::new(
            "http://localhost:8080",
            Duration::from_secs(5),
            DEFAULT_SIMILARITY_URL,
            "token".to_string(),
        )
        .unwrap();

        assert_eq!(config.scraper_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.similarity_lang, "es");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_urls() {
        let result = Config::new(
            "not a url",
            Duration::from_secs(5),
            DEFAULT_SIMILARITY_URL,
            String::new(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
