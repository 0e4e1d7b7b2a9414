use ct_core::ArticleSummary;
use serde::{Deserialize, Serialize};

/// Articles the user picked for later comparison. Insertion-ordered and
/// unique by url; persisted across sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<ArticleSummary>,
}

impl CartState {
    pub fn contains(&self, url: &str) -> bool {
        self.items.iter().any(|item| item.url == url)
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone)]
pub enum CartAction {
    /// Appends a summary. A url already in the cart is a no-op, which
    /// keeps adds idempotent whatever the caller does.
    Add(ArticleSummary),
    /// Drops the entry with this url; absent urls are a no-op.
    Remove(String),
    Clear,
}

pub(crate) fn reduce(state: &mut CartState, action: &CartAction) {
    match action {
        CartAction::Add(summary) => {
            if !state.contains(&summary.url) {
                state.items.push(summary.clone());
            }
        }
        CartAction::Remove(url) => {
            state.items.retain(|item| item.url != *url);
        }
        CartAction::Clear => {
            state.items.clear();
        }
    }
}
