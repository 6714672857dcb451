//! Feed-source collaborator and refresh outcome types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{FeedItem, FeedSource, FeedSourceId};

/// Why a single source could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedFetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("source answered with status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Pulls the current items of one feed source.
///
/// Payload parsing lives entirely behind this trait.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FeedFetchError>;
}

/// Result of refreshing one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshStatus {
    Refreshed { items: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source_id: FeedSourceId,
    pub source_name: String,
    #[serde(flatten)]
    pub status: RefreshStatus,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RefreshStatus::Refreshed { .. })
    }
}

/// Aggregate of a refresh fan-out, one outcome per source in registration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub outcomes: Vec<SourceOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl RefreshReport {
    pub fn from_outcomes(outcomes: Vec<SourceOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;
        Self {
            outcomes,
            succeeded,
            failed,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}
