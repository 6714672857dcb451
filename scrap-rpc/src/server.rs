//! HTTP batch endpoint.
//!
//! `POST <rpc_path>` takes a JSON array of call envelopes and answers with a
//! JSON array of results in the same order. Every entry gets its own
//! [`Context`](crate::context::Context) built from the request headers, and
//! entries run concurrently. One entry failing never affects the others.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use futures::future::join_all;
use http::HeaderMap;

use scrap_contracts::{BatchRequest, BatchResponse, CallEnvelope, CallResult};

use crate::caller::invoke;
use crate::context::ContextFactory;
use crate::error::ApiError;
use crate::router::Router;

/// Largest batch the endpoint accepts.
pub const MAX_BATCH_CALLS: usize = 256;

/// Shared state of the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub contexts: ContextFactory,
}

impl AppState {
    pub fn new(router: Arc<Router>, contexts: ContextFactory) -> Self {
        Self { router, contexts }
    }
}

/// Build the axum router serving `rpc_path` and `/health`.
pub fn http_router(state: AppState, rpc_path: &str) -> axum::Router {
    axum::Router::new()
        .route(rpc_path, post(handle_batch))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn handle_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(batch) =
        body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if batch.is_empty() {
        return Err(ApiError::BadRequest("batch must contain at least one call".into()));
    }
    if batch.len() > MAX_BATCH_CALLS {
        return Err(ApiError::PayloadTooLarge(format!(
            "batch of {} calls exceeds the limit of {MAX_BATCH_CALLS}",
            batch.len()
        )));
    }

    tracing::debug!(calls = batch.len(), "dispatching batch");
    let results = join_all(
        batch
            .into_iter()
            .map(|call| dispatch_entry(&state, &headers, call)),
    )
    .await;
    Ok(Json(results))
}

async fn dispatch_entry(state: &AppState, headers: &HeaderMap, call: CallEnvelope) -> CallResult {
    let ctx = state.contexts.create(headers).await;
    invoke(&state.router, ctx, call.kind, &call.procedure, call.input)
        .await
        .map_err(|err| err.to_rpc_error())
        .into()
}
