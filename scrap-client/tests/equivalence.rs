//! The batching client over HTTP and the in-process direct caller must agree
//! for every procedure, input and session.
//!
//! The HTTP leg runs the real axum router in process through
//! `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, HeaderValue, Request};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use scrap_client::{BatchClient, BatchSettings, BatchTransport, ClientError, TransportError};
use scrap_contracts::{BatchRequest, BatchResponse, ProcedureKind};
use scrap_core::{
    Category, CategoryId, FeedFetchError, FeedFetcher, FeedItem, FeedSource, FeedSourceId,
    Identity, Role, ScrapBook, ScrapBookId, UserId,
};
use scrap_rpc::{
    AppState, ContextFactory, DirectCaller, StaticSessionResolver, app_router, http_router,
};
use scrap_store::{MemoryStore, ScrapStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct NoFeeds;

#[async_trait]
impl FeedFetcher for NoFeeds {
    async fn fetch(&self, _source: &FeedSource) -> Result<Vec<FeedItem>, FeedFetchError> {
        Ok(Vec::new())
    }
}

/// Drives the axum app in process.
struct Loopback {
    app: axum::Router,
    headers: HeaderMap,
}

#[async_trait]
impl BatchTransport for Loopback {
    async fn send(&self, batch: BatchRequest) -> Result<BatchResponse, TransportError> {
        let mut request = Request::post("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&batch).unwrap()))
            .unwrap();
        request.headers_mut().extend(self.headers.clone());
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        if !status.is_success() {
            return Err(TransportError::from_http_status(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })
    }
}

struct World {
    contexts: ContextFactory,
    direct: DirectCaller,
    app: axum::Router,
    public_book: ScrapBookId,
    private_book: ScrapBookId,
    category: CategoryId,
}

async fn world() -> World {
    let store: Arc<dyn ScrapStore> = Arc::new(MemoryStore::new());
    let created = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();

    let public_book = ScrapBook {
        id: ScrapBookId::new(),
        owner: UserId::new("u1"),
        title: "Trips".into(),
        description: Some("Postcards".into()),
        scrap_count: 4,
        is_public: true,
        created_at: created,
    };
    let private_book = ScrapBook {
        id: ScrapBookId::new(),
        is_public: false,
        title: "Diary".into(),
        ..public_book.clone()
    };
    store.save_scrap_book(&public_book).await.unwrap();
    store.save_scrap_book(&private_book).await.unwrap();

    let category = Category {
        id: CategoryId::new(),
        owner: UserId::new("u1"),
        name: "Errands".into(),
        color: "#3B82F6".into(),
        created_at: created,
        updated_at: created,
    };
    store.save_category(&category).await.unwrap();

    let source = FeedSource {
        id: FeedSourceId::new(),
        name: "news".into(),
        url: "https://news.example.com/feed.json".into(),
        owner: None,
    };
    store.save_feed_source(&source).await.unwrap();
    store
        .replace_feed_items(
            &source.id,
            vec![FeedItem {
                id: "n1".into(),
                source_id: source.id,
                title: "Headline".into(),
                url: "https://news.example.com/n1".into(),
                published_at: Some(created),
            }],
        )
        .await
        .unwrap();

    let resolver = StaticSessionResolver::new().with_session(
        "tok-u1",
        Identity {
            user_id: UserId::new("u1"),
            display_name: "U1".into(),
            role: Role::Member,
        },
    );
    let contexts = ContextFactory::new(Arc::new(resolver), store, "scrap_session");
    let router = Arc::new(app_router(Arc::new(NoFeeds)).unwrap());

    World {
        direct: DirectCaller::new(Arc::clone(&router)),
        app: http_router(AppState::new(router, contexts.clone()), "/rpc"),
        contexts,
        public_book: public_book.id,
        private_book: private_book.id,
        category: category.id,
    }
}

fn session_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
    }
    headers
}

fn cases(w: &World) -> Vec<(ProcedureKind, &'static str, Value)> {
    use ProcedureKind::{Mutation, Query};
    vec![
        (Query, "feed.public", Value::Null),
        (Query, "feed.mine", Value::Null),
        (Query, "feed.sources", json!({})),
        (Query, "scrapBook.public", Value::Null),
        (Query, "scrapBook.list", Value::Null),
        (Query, "scrapBook.get", json!({ "id": w.public_book.to_string() })),
        (Query, "scrapBook.get", json!({ "id": w.private_book.to_string() })),
        (Query, "scrapBook.get", json!({ "id": 42 })),
        (Query, "todoCategory.list", Value::Null),
        (Mutation, "todoCategory.create", json!({ "name": "", "color": "red" })),
        (Mutation, "todoCategory.update", json!({ "id": w.category.to_string(), "color": "#12" })),
        (Mutation, "todoCategory.delete", json!({ "id": CategoryId::new().to_string() })),
        (Mutation, "feed.refreshAll", Value::Null),
        (Mutation, "feed.public", Value::Null),
        (Query, "feed.unknown", Value::Null),
    ]
}

async fn assert_equivalent(token: Option<&str>) {
    let w = world().await;
    let headers = session_headers(token);
    let client = BatchClient::new(
        Arc::new(Loopback {
            app: w.app.clone(),
            headers: headers.clone(),
        }),
        BatchSettings::default(),
    );

    let cases = cases(&w);
    let batched: Vec<_> = cases
        .iter()
        .map(|(kind, name, input)| client.call(*kind, *name, input.clone()))
        .collect();
    let batched = futures::future::join_all(batched).await;
    assert_eq!(client.batches_sent(), 1);

    for ((kind, name, input), via_http) in cases.into_iter().zip(batched) {
        let ctx = w.contexts.create(&headers).await;
        let direct = w.direct.call(ctx, kind, name, input).await;
        match (direct, via_http) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "{name}: results differ"),
            (Err(a), Err(ClientError::Procedure { error, .. })) => {
                assert_eq!(a.to_rpc_error(), error, "{name}: errors differ")
            }
            (a, b) => panic!("{name}: direct {a:?} vs batched {b:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_anonymous_paths_agree() {
    assert_equivalent(None).await;
}

#[tokio::test]
async fn test_authenticated_paths_agree() {
    assert_equivalent(Some("tok-u1")).await;
}

#[tokio::test]
async fn test_unknown_token_agrees_with_anonymous() {
    assert_equivalent(Some("expired")).await;
}

#[tokio::test]
async fn test_server_rejection_fails_every_call() {
    let client = BatchClient::new(
        Arc::new(Loopback {
            app: axum::Router::new(),
            headers: HeaderMap::new(),
        }),
        BatchSettings::default(),
    );
    let (a, b) = tokio::join!(
        client.query("feed.public", Value::Null),
        client.query("scrapBook.public", Value::Null)
    );
    assert!(matches!(
        a.unwrap_err(),
        ClientError::Transport(TransportError::Status { status: 404, .. })
    ));
    assert!(b.unwrap_err().is_transport());
}
