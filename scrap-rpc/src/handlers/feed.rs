//! `feed.*` procedures.

use std::sync::Arc;

use futures::future::join_all;

use scrap_core::{
    FeedFetcher, FeedItem, FeedScope, FeedSource, NoInput, ProcedureError, RefreshReport,
    RefreshStatus, Role, SourceOutcome,
};
use scrap_store::ScrapStore;

use crate::context::Context;
use crate::router::ProcedureGroup;

pub fn group(fetcher: Arc<dyn FeedFetcher>) -> ProcedureGroup {
    ProcedureGroup::new("feed")
        .query("public", public)
        .query("mine", mine)
        .query("sources", sources)
        .mutation("refreshAll", move |ctx, _: NoInput| {
            let fetcher = Arc::clone(&fetcher);
            async move { refresh_all(ctx, fetcher).await }
        })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn public(ctx: Context, _: NoInput) -> Result<Vec<FeedItem>, ProcedureError> {
    Ok(ctx.store().list_feed_items(&FeedScope::Public).await?)
}

async fn mine(ctx: Context, _: NoInput) -> Result<Vec<FeedItem>, ProcedureError> {
    let user = ctx.require_identity()?.user_id.clone();
    Ok(ctx.store().list_feed_items(&FeedScope::User(user)).await?)
}

/// Public sources plus the caller's own.
async fn sources(ctx: Context, _: NoInput) -> Result<Vec<FeedSource>, ProcedureError> {
    let all = ctx.store().list_feed_sources().await?;
    let caller = ctx.user_id();
    Ok(all
        .into_iter()
        .filter(|source| source.is_public() || source.owner.as_ref() == caller)
        .collect())
}

/// Fetch every registered source concurrently, one task per source.
///
/// Sources are independent: a failed or panicking fetch is reported in its
/// outcome and leaves that source's stored items untouched.
async fn refresh_all(
    ctx: Context,
    fetcher: Arc<dyn FeedFetcher>,
) -> Result<RefreshReport, ProcedureError> {
    let admin = ctx.require_role(Role::Admin)?;
    let registered = ctx.store().list_feed_sources().await?;
    tracing::info!(
        sources = registered.len(),
        requested_by = %admin.user_id,
        "refreshing feed sources"
    );

    let outcomes = join_all(
        registered
            .into_iter()
            .map(|source| spawn_refresh(ctx.shared_store(), Arc::clone(&fetcher), source)),
    )
    .await;

    let report = RefreshReport::from_outcomes(outcomes);
    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "feed refresh finished"
    );
    Ok(report)
}

async fn spawn_refresh(
    store: Arc<dyn ScrapStore>,
    fetcher: Arc<dyn FeedFetcher>,
    source: FeedSource,
) -> SourceOutcome {
    let source_id = source.id;
    let source_name = source.name.clone();
    let task = tokio::spawn(async move {
        refresh_source(store.as_ref(), fetcher.as_ref(), &source).await
    });
    match task.await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(
                source = %source_name,
                error = %err,
                "feed source refresh task failed"
            );
            SourceOutcome {
                source_id,
                source_name,
                status: RefreshStatus::Failed {
                    reason: format!("refresh task failed: {err}"),
                },
            }
        }
    }
}

async fn refresh_source(
    store: &dyn ScrapStore,
    fetcher: &dyn FeedFetcher,
    source: &FeedSource,
) -> SourceOutcome {
    let status = match fetcher.fetch(source).await {
        Ok(mut items) => {
            for item in &mut items {
                item.source_id = source.id;
            }
            let count = items.len();
            match store.replace_feed_items(&source.id, items).await {
                Ok(()) => RefreshStatus::Refreshed { items: count },
                Err(err) => RefreshStatus::Failed {
                    reason: err.to_string(),
                },
            }
        }
        Err(err) => RefreshStatus::Failed {
            reason: err.to_string(),
        },
    };
    if let RefreshStatus::Failed { reason } = &status {
        tracing::warn!(source = %source.name, %reason, "feed source refresh failed");
    }
    SourceOutcome {
        source_id: source.id,
        source_name: source.name.clone(),
        status,
    }
}
