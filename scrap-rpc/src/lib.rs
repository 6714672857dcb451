//! scrap-rpc - Typed procedure server for the scrapbook backend
//!
//! Procedures are registered once in a [`Router`] and reached two ways:
//! over HTTP through the batch endpoint in [`server`], or in-process through
//! [`DirectCaller`]. Both go through [`caller::invoke`].

pub mod caller;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod router;
pub mod server;

pub use caller::{DirectCaller, invoke};
pub use context::{AuthError, Context, ContextFactory, SessionResolver, StaticSessionResolver};
pub use error::{ApiError, ErrorResponse};
pub use fetcher::HttpFeedFetcher;
pub use handlers::app_router;
pub use router::{Procedure, ProcedureGroup, Router, RouterBuildError, RouterBuilder};
pub use server::{AppState, http_router};

use scrap_core::config::FeedsConfig;
use scrap_core::{FeedSource, FeedSourceId, UserId};
use scrap_store::{ScrapStore, StoreError};

/// Register the feed sources listed in configuration. Returns how many were
/// added.
pub async fn register_feed_sources(
    store: &dyn ScrapStore,
    feeds: &FeedsConfig,
) -> Result<usize, StoreError> {
    for entry in &feeds.sources {
        let source = FeedSource {
            id: FeedSourceId::new(),
            name: entry.name.clone(),
            url: entry.url.clone(),
            owner: entry.owner.clone().map(UserId::new),
        };
        store.save_feed_source(&source).await?;
        tracing::debug!(
            source = %source.name,
            public = source.is_public(),
            "feed source registered"
        );
    }
    Ok(feeds.sources.len())
}
