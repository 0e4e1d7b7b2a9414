use serde::{Deserialize, Serialize};

/// Remembers the last successfully submitted search topic, for
/// back-navigation into the results view. Persisted across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub last_topic: String,
}

#[derive(Debug, Clone)]
pub enum SearchAction {
    UpdateTopic(String),
    ClearTopic,
}

pub(crate) fn reduce(state: &mut SearchState, action: &SearchAction) {
    match action {
        SearchAction::UpdateTopic(topic) => {
            state.last_topic = topic.clone();
        }
        SearchAction::ClearTopic => {
            state.last_topic.clear();
        }
    }
}
