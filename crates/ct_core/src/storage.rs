use async_trait::async_trait;

use crate::Result;

/// Storage key for the persisted cart slice.
pub const CART_KEY: &str = "persist:cart";
/// Storage key for the persisted search slice.
pub const SEARCH_KEY: &str = "persist:search";

/// Durable key-value storage for persisted state slices.
///
/// Persistence is best-effort convenience state, not a source of truth:
/// callers save fire-and-forget after mutations and hydrate once at
/// startup.
#[async_trait]
pub trait StateStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;
}
