//! Storage errors

use scrap_core::FeedSourceId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Feed source not registered: {0}")]
    UnknownFeedSource(FeedSourceId),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
