use std::sync::{Arc, RwLock};

use ct_core::storage::{CART_KEY, SEARCH_KEY};
use ct_core::StateStorage;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cart::{self, CartAction, CartState};
use crate::compare::{self, CompareAction, CompareState};
use crate::search::{self, SearchAction, SearchState};

/// The composed application state: independent slices merged into one
/// root object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub cart: CartState,
    pub search: SearchState,
    pub compare: CompareState,
}

#[derive(Debug, Clone)]
pub enum Action {
    Cart(CartAction),
    Search(SearchAction),
    Compare(CompareAction),
}

impl From<CartAction> for Action {
    fn from(action: CartAction) -> Self {
        Action::Cart(action)
    }
}

impl From<SearchAction> for Action {
    fn from(action: SearchAction) -> Self {
        Action::Search(action)
    }
}

impl From<CompareAction> for Action {
    fn from(action: CompareAction) -> Self {
        Action::Compare(action)
    }
}

/// Central state container: `state()` for snapshots, `dispatch()` for
/// pure synchronous transitions, `subscribe()` for change notification.
///
/// Mutations are atomic with respect to each other; persistence of the
/// cart and search slices happens fire-and-forget after the mutation and
/// never blocks or fails a dispatch.
pub struct Store {
    state: RwLock<RootState>,
    tx: watch::Sender<RootState>,
    storage: Option<Arc<dyn StateStorage>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::from_state(RootState::default(), None)
    }

    pub fn with_persistence(storage: Arc<dyn StateStorage>) -> Self {
        Self::from_state(RootState::default(), Some(storage))
    }

    /// Loads the persisted cart and search slices, then attaches the
    /// storage for future saves. Unreadable or corrupt values fall back
    /// to defaults; persistence is never a source of truth.
    pub async fn hydrated(storage: Arc<dyn StateStorage>) -> Self {
        let mut root = RootState::default();
        match storage.get_item(CART_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(cart) => root.cart = cart,
                Err(e) => warn!("ignoring corrupt {}: {}", CART_KEY, e),
            },
            Ok(None) => {}
            Err(e) => warn!("could not hydrate {}: {}", CART_KEY, e),
        }
        match storage.get_item(SEARCH_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(search) => root.search = search,
                Err(e) => warn!("ignoring corrupt {}: {}", SEARCH_KEY, e),
            },
            Ok(None) => {}
            Err(e) => warn!("could not hydrate {}: {}", SEARCH_KEY, e),
        }
        Self::from_state(root, Some(storage))
    }

    fn from_state(root: RootState, storage: Option<Arc<dyn StateStorage>>) -> Self {
        let (tx, _) = watch::channel(root.clone());
        Self {
            state: RwLock::new(root),
            tx,
            storage,
        }
    }

    pub fn state(&self) -> RootState {
        self.state.read().unwrap().clone()
    }

    /// Receiver that yields the root state after every dispatch.
    pub fn subscribe(&self) -> watch::Receiver<RootState> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        debug!("dispatching {:?}", action);
        let snapshot = {
            let mut state = self.state.write().unwrap();
            match &action {
                Action::Cart(a) => cart::reduce(&mut state.cart, a),
                Action::Search(a) => search::reduce(&mut state.search, a),
                Action::Compare(a) => compare::reduce(&mut state.compare, a),
            }
            state.clone()
        };
        let _ = self.tx.send(snapshot.clone());
        self.persist_after(&action, snapshot);
    }

    fn persist_after(&self, action: &Action, snapshot: RootState) {
        let Some(storage) = &self.storage else {
            return;
        };
        let (key, payload) = match action {
            Action::Cart(_) => (CART_KEY, serde_json::to_string(&snapshot.cart)),
            Action::Search(_) => (SEARCH_KEY, serde_json::to_string(&snapshot.search)),
            // Compare selections are session-scoped and never persisted.
            Action::Compare(_) => return,
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!("could not serialize {}: {}", key, e);
                return;
            }
        };
        let storage = Arc::clone(storage);
        tokio::spawn(async move {
            if let Err(e) = storage.set_item(key, &payload).await {
                warn!("failed to persist {}: {}", key, e);
            }
        });
    }

    /// Session-teardown hook: drops both persisted slices from storage.
    pub async fn purge(storage: &dyn StateStorage) -> ct_core::Result<()> {
        storage.remove_item(CART_KEY).await?;
        storage.remove_item(SEARCH_KEY).await?;
        Ok(())
    }
}
