//! Procedure groups served by the scrapbook backend.
//!
//! Each sub-module builds one [`ProcedureGroup`](crate::router::ProcedureGroup);
//! [`app_router`] merges them into the router both transports share.

pub mod feed;
pub mod scrap_book;
pub mod todo_category;

use std::sync::Arc;

use scrap_core::FeedFetcher;

use crate::router::{Router, RouterBuildError, RouterBuilder};

/// Every procedure the application exposes.
pub fn app_router(fetcher: Arc<dyn FeedFetcher>) -> Result<Router, RouterBuildError> {
    RouterBuilder::new()
        .merge(feed::group(fetcher))
        .merge(scrap_book::group())
        .merge(todo_category::group())
        .build()
}
