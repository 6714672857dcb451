//! In-memory store (development and tests)

use crate::{ScrapBookFilter, ScrapStore, StoreError};
use async_trait::async_trait;
use indexmap::IndexMap;
use scrap_core::{
    Category, CategoryId, FeedItem, FeedScope, FeedSource, FeedSourceId, ScrapBook, ScrapBookId,
    UserId,
};
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    scrap_books: HashMap<ScrapBookId, ScrapBook>,
    feed_sources: IndexMap<FeedSourceId, FeedSource>,
    feed_items: HashMap<FeedSourceId, Vec<FeedItem>>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScrapStore for MemoryStore {
    async fn list_categories(&self, owner: &UserId) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.get(id).cloned())
    }

    async fn save_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.categories.remove(id).is_some())
    }

    async fn list_scrap_books(
        &self,
        filter: ScrapBookFilter,
    ) -> Result<Vec<ScrapBook>, StoreError> {
        let tables = self.tables.read().await;
        let mut books: Vec<ScrapBook> = tables
            .scrap_books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();

        // Sort by created_at descending
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        // Apply pagination
        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);

        Ok(books.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_scrap_book(&self, id: &ScrapBookId) -> Result<Option<ScrapBook>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.scrap_books.get(id).cloned())
    }

    async fn save_scrap_book(&self, book: &ScrapBook) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.scrap_books.insert(book.id, book.clone());
        Ok(())
    }

    async fn list_feed_sources(&self) -> Result<Vec<FeedSource>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.feed_sources.values().cloned().collect())
    }

    async fn save_feed_source(&self, source: &FeedSource) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.feed_sources.insert(source.id, source.clone());
        Ok(())
    }

    async fn replace_feed_items(
        &self,
        source: &FeedSourceId,
        items: Vec<FeedItem>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.feed_sources.contains_key(source) {
            return Err(StoreError::UnknownFeedSource(*source));
        }
        tables.feed_items.insert(*source, items);
        Ok(())
    }

    async fn list_feed_items(&self, scope: &FeedScope) -> Result<Vec<FeedItem>, StoreError> {
        let tables = self.tables.read().await;
        let mut items: Vec<FeedItem> = tables
            .feed_sources
            .values()
            .filter(|source| scope.contains(source))
            .filter_map(|source| tables.feed_items.get(&source.id))
            .flatten()
            .cloned()
            .collect();
        // Stable sort keeps source order among equal timestamps.
        items.sort_by_key(|item| (item.published_at.is_none(), Reverse(item.published_at)));
        Ok(items)
    }
}
