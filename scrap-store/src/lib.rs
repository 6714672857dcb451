//! scrap-store - Persistence capability for scrapbook procedures
//!
//! Procedures see storage only through [`ScrapStore`]. The schema behind it
//! belongs to whichever backend is plugged in; [`MemoryStore`] ships here for
//! development and tests.

mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use scrap_core::{
    Category, CategoryId, FeedItem, FeedScope, FeedSource, FeedSourceId, ScrapBook, ScrapBookId,
    UserId,
};

/// Filter for listing scrap books
#[derive(Debug, Clone, Default)]
pub struct ScrapBookFilter {
    /// Only books owned by this user
    pub owner: Option<UserId>,
    /// Only public books
    pub public_only: bool,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Offset for pagination
    pub offset: Option<usize>,
}

impl ScrapBookFilter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Default::default()
        }
    }

    pub fn public() -> Self {
        Self {
            public_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, book: &ScrapBook) -> bool {
        if let Some(owner) = &self.owner
            && &book.owner != owner
        {
            return false;
        }
        !self.public_only || book.is_public
    }
}

/// Abstraction over storage backends, keyed by entity id / user id.
#[async_trait]
pub trait ScrapStore: Send + Sync {
    /// Categories owned by `owner`, oldest first
    async fn list_categories(&self, owner: &UserId) -> Result<Vec<Category>, StoreError>;

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, StoreError>;

    /// Save a category (create or update)
    async fn save_category(&self, category: &Category) -> Result<(), StoreError>;

    /// Delete a category. Returns whether it existed.
    async fn delete_category(&self, id: &CategoryId) -> Result<bool, StoreError>;

    /// Scrap books matching filter, newest first
    async fn list_scrap_books(&self, filter: ScrapBookFilter)
    -> Result<Vec<ScrapBook>, StoreError>;

    async fn get_scrap_book(&self, id: &ScrapBookId) -> Result<Option<ScrapBook>, StoreError>;

    async fn save_scrap_book(&self, book: &ScrapBook) -> Result<(), StoreError>;

    /// Registered feed sources in registration order
    async fn list_feed_sources(&self) -> Result<Vec<FeedSource>, StoreError>;

    async fn save_feed_source(&self, source: &FeedSource) -> Result<(), StoreError>;

    /// Replace the stored items of one source with a fresh fetch.
    async fn replace_feed_items(
        &self,
        source: &FeedSourceId,
        items: Vec<FeedItem>,
    ) -> Result<(), StoreError>;

    /// Items of every source in `scope`, newest first. Undated items sort
    /// last.
    async fn list_feed_items(&self, scope: &FeedScope) -> Result<Vec<FeedItem>, StoreError>;
}

impl From<StoreError> for scrap_core::ProcedureError {
    fn from(err: StoreError) -> Self {
        scrap_core::ProcedureError::Store(err.to_string())
    }
}
