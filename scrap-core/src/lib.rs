//! scrap-core - Domain types and input validation for the scrapbook RPC layer
//!
//! Holds everything a procedure handler needs that is not transport: caller
//! sessions, validated input DTOs, the procedure error type, the feed-source
//! collaborator and layered configuration.

pub mod config;
pub mod dto;
pub mod error;
pub mod feed;
pub mod schema;
pub mod session;
pub mod types;

pub use config::{Config, ConfigError};
pub use dto::{
    CategoryRef, CreateCategory, DEFAULT_CATEGORY_COLOR, NoInput, ScrapBookRef, UpdateCategory,
    UpdateCategoryInput,
};
pub use error::ProcedureError;
pub use feed::{FeedFetchError, FeedFetcher, RefreshReport, RefreshStatus, SourceOutcome};
pub use schema::{FieldError, Schema, Validate, ValidationErrors, Violation};
pub use session::{Identity, Role, Session};
pub use types::{
    Category, CategoryId, FeedItem, FeedScope, FeedSource, FeedSourceId, ScrapBook, ScrapBookId,
    UserId,
};
