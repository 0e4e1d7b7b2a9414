use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Author of an article. Some newspapers publish author pages, some only a
/// byline, so the url is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Lightweight article metadata returned by a search. Identity is `url`;
/// a summary is immutable once fetched and `date_time` holds the display
/// string produced at the network boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub newspaper: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub title: String,
    pub excerpt: String,
    pub date_time: String,
    pub url: String,
    pub is_premium: bool,
}

/// Heading/paragraph tag of a body block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    H2,
    H3,
    P,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::H2 => "h2",
            BlockTag::H3 => "h3",
            BlockTag::P => "p",
        }
    }
}

/// One ordered element of an article body. The wire shape is a single-entry
/// map, `{"h2": "Some heading"}`, kept from the scraping backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct BodyBlock {
    pub tag: BlockTag,
    pub content: String,
}

impl BodyBlock {
    pub fn new(tag: BlockTag, content: impl Into<String>) -> Self {
        Self {
            tag,
            content: content.into(),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for BodyBlock {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> std::result::Result<Self, Self::Error> {
        let mut entries = map.into_iter();
        let (tag, content) = entries
            .next()
            .ok_or_else(|| "empty body block".to_string())?;
        if entries.next().is_some() {
            return Err("body block with more than one tag".to_string());
        }
        let tag = match tag.as_str() {
            "h2" => BlockTag::H2,
            "h3" => BlockTag::H3,
            "p" => BlockTag::P,
            other => return Err(format!("unknown body block tag: {}", other)),
        };
        Ok(Self { tag, content })
    }
}

impl From<BodyBlock> for BTreeMap<String, String> {
    fn from(block: BodyBlock) -> Self {
        let mut map = BTreeMap::new();
        map.insert(block.tag.as_str().to_string(), block.content);
        map
    }
}

/// Full article body, fetched lazily when a summary is selected for
/// detailed display or comparison. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub newspaper: String,
    pub headline: String,
    pub subheadline: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub last_date_time: String,
    pub body: Vec<BodyBlock>,
    pub url: String,
}

impl Article {
    /// Concatenated text content of every body block, in order. This is
    /// what gets submitted to the similarity endpoint.
    pub fn plain_text(&self) -> String {
        self.body
            .iter()
            .map(|block| block.content.as_str())
            .collect()
    }
}

/// Per-scraper slice of one search page, already normalized: either the
/// summaries that source returned or the message it failed with.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResult {
    pub scraper: String,
    pub outcome: std::result::Result<Vec<ArticleSummary>, String>,
}
