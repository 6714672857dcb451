//! Behaviour of the application procedures through the direct caller.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use scrap_contracts::ErrorCode;
use scrap_core::{
    Category, FeedFetchError, FeedFetcher, FeedItem, FeedSource, FeedSourceId, Identity,
    ProcedureError, RefreshReport, Role, ScrapBook, ScrapBookId, Session, UserId,
};
use scrap_rpc::{Context, DirectCaller, app_router};
use scrap_store::{MemoryStore, ScrapStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Serves two items per source unless the source name is in `failing`.
/// Sources named `slow-*` take ten seconds; `crash` panics.
struct StubFetcher {
    failing: HashSet<String>,
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FeedFetchError> {
        if source.name.starts_with("slow-") {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if source.name == "crash" {
            panic!("fetcher crashed on {}", source.url);
        }
        if self.failing.contains(&source.name) {
            return Err(FeedFetchError::Status(503));
        }
        Ok((1..=2)
            .map(|n| FeedItem {
                id: format!("{}-{n}", source.name),
                source_id: FeedSourceId::new(),
                title: format!("{} #{n}", source.name),
                url: format!("{}/{n}", source.url),
                published_at: Some(Utc.with_ymd_and_hms(2026, 4, n, 0, 0, 0).unwrap()),
            })
            .collect())
    }
}

struct Harness {
    caller: DirectCaller,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new(failing: &[&str]) -> Self {
        let fetcher = StubFetcher {
            failing: failing.iter().map(|s| s.to_string()).collect(),
        };
        let router = app_router(Arc::new(fetcher)).unwrap();
        Self {
            caller: DirectCaller::new(Arc::new(router)),
            store: Arc::new(MemoryStore::new()),
        }
    }

    fn ctx(&self, session: Session) -> Context {
        Context::new(session, Arc::clone(&self.store) as Arc<dyn ScrapStore>)
    }

    fn anon(&self) -> Context {
        self.ctx(Session::Anonymous)
    }

    fn user(&self, id: &str) -> Context {
        self.ctx(Session::Authenticated(identity(id, Role::Member)))
    }

    fn admin(&self) -> Context {
        self.ctx(Session::Authenticated(identity("root", Role::Admin)))
    }

    async fn add_source(&self, name: &str, owner: Option<&str>) -> FeedSource {
        let source = FeedSource {
            id: FeedSourceId::new(),
            name: name.into(),
            url: format!("https://{name}.example.com/feed.json"),
            owner: owner.map(UserId::new),
        };
        self.store.save_feed_source(&source).await.unwrap();
        source
    }
}

fn identity(id: &str, role: Role) -> Identity {
    Identity {
        user_id: UserId::new(id),
        display_name: id.to_uppercase(),
        role,
    }
}

fn code(err: &ProcedureError) -> ErrorCode {
    err.to_rpc_error().code
}

// ---------------------------------------------------------------------------
// feed.*
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_isolates_failing_source() {
    let h = Harness::new(&["beta"]);
    let alpha = h.add_source("alpha", None).await;
    let beta = h.add_source("beta", None).await;
    let gamma = h.add_source("gamma", None).await;

    let stale = FeedItem {
        id: "beta-old".into(),
        source_id: beta.id,
        title: "old".into(),
        url: "https://beta.example.com/old".into(),
        published_at: None,
    };
    h.store
        .replace_feed_items(&beta.id, vec![stale.clone()])
        .await
        .unwrap();

    let report: RefreshReport = serde_json::from_value(
        h.caller
            .mutation(h.admin(), "feed.refreshAll", Value::Null)
            .await
            .unwrap(),
    )
    .unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    let names: Vec<_> = report.outcomes.iter().map(|o| o.source_name.as_str()).collect();
    assert_eq!(names, ["alpha", "beta", "gamma"]);
    assert_eq!(report.failures().next().unwrap().source_id, beta.id);

    let items: Vec<FeedItem> = h
        .caller
        .query_as(h.anon(), "feed.public", Value::Null)
        .await
        .unwrap();
    assert_eq!(items.len(), 5);
    assert!(items.contains(&stale));
    for source in [&alpha, &gamma] {
        assert_eq!(items.iter().filter(|i| i.source_id == source.id).count(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_refresh_fetches_sources_concurrently() {
    let h = Harness::new(&[]);
    h.add_source("slow-a", None).await;
    h.add_source("slow-b", None).await;
    h.add_source("fast", None).await;

    let started = tokio::time::Instant::now();
    let report: RefreshReport = serde_json::from_value(
        h.caller
            .mutation(h.admin(), "feed.refreshAll", Value::Null)
            .await
            .unwrap(),
    )
    .unwrap();

    assert_eq!(report.succeeded, 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(20), "sources ran one after another: {elapsed:?}");
}

#[tokio::test]
async fn test_refresh_survives_panicking_fetch() {
    let h = Harness::new(&[]);
    h.add_source("alpha", None).await;
    let crash = h.add_source("crash", None).await;

    let report: RefreshReport = serde_json::from_value(
        h.caller
            .mutation(h.admin(), "feed.refreshAll", Value::Null)
            .await
            .unwrap(),
    )
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.source_id, crash.id);
    assert_eq!(failure.source_name, "crash");
}

#[tokio::test]
async fn test_refresh_requires_admin() {
    let h = Harness::new(&[]);
    let err = h
        .caller
        .mutation(h.user("u1"), "feed.refreshAll", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::Forbidden);

    let err = h
        .caller
        .mutation(h.anon(), "feed.refreshAll", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::Unauthenticated);
}

#[tokio::test]
async fn test_refresh_with_no_sources_is_empty_report() {
    let h = Harness::new(&[]);
    let report: RefreshReport = serde_json::from_value(
        h.caller
            .mutation(h.admin(), "feed.refreshAll", json!({}))
            .await
            .unwrap(),
    )
    .unwrap();
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn test_personal_feed_needs_identity_public_does_not() {
    let h = Harness::new(&[]);
    h.add_source("news", None).await;
    h.add_source("private", Some("u1")).await;
    h.caller
        .mutation(h.admin(), "feed.refreshAll", Value::Null)
        .await
        .unwrap();

    let err = h
        .caller
        .query(h.anon(), "feed.mine", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err, ProcedureError::Unauthenticated);

    let public: Vec<FeedItem> = h
        .caller
        .query_as(h.anon(), "feed.public", Value::Null)
        .await
        .unwrap();
    assert!(public.iter().all(|i| i.id.starts_with("news")));

    let mine: Vec<FeedItem> = h
        .caller
        .query_as(h.user("u1"), "feed.mine", Value::Null)
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|i| i.id.starts_with("private")));
}

#[tokio::test]
async fn test_sources_hide_other_users_private_sources() {
    let h = Harness::new(&[]);
    h.add_source("news", None).await;
    h.add_source("u1-only", Some("u1")).await;

    let as_u2: Vec<FeedSource> = h
        .caller
        .query_as(h.user("u2"), "feed.sources", Value::Null)
        .await
        .unwrap();
    assert_eq!(as_u2.len(), 1);

    let as_u1: Vec<FeedSource> = h
        .caller
        .query_as(h.user("u1"), "feed.sources", Value::Null)
        .await
        .unwrap();
    assert_eq!(as_u1.len(), 2);
}

// ---------------------------------------------------------------------------
// todoCategory.*
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_category_applies_default_color() {
    let h = Harness::new(&[]);
    let created = h
        .caller
        .mutation(h.user("u1"), "todoCategory.create", json!({ "name": "Errands" }))
        .await
        .unwrap();
    assert_eq!(created["color"], "#3B82F6");
    assert_eq!(created["owner"], "u1");
}

#[tokio::test]
async fn test_create_category_reports_field_errors() {
    let h = Harness::new(&[]);
    let err = h
        .caller
        .mutation(
            h.user("u1"),
            "todoCategory.create",
            json!({ "name": "x".repeat(51), "color": "blue" }),
        )
        .await
        .unwrap_err();
    let ProcedureError::Validation(errors) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.for_field("name").next().is_some());
    assert!(errors.for_field("color").next().is_some());
    assert!(h.store.list_categories(&UserId::new("u1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_category_requires_identity() {
    let h = Harness::new(&[]);
    let err = h
        .caller
        .mutation(h.anon(), "todoCategory.create", json!({ "name": "Errands" }))
        .await
        .unwrap_err();
    assert_eq!(err, ProcedureError::Unauthenticated);
}

#[tokio::test]
async fn test_update_changes_only_supplied_fields() {
    let h = Harness::new(&[]);
    let created: Category = serde_json::from_value(
        h.caller
            .mutation(
                h.user("u1"),
                "todoCategory.create",
                json!({ "name": "Work", "color": "#abc" }),
            )
            .await
            .unwrap(),
    )
    .unwrap();

    let updated: Category = serde_json::from_value(
        h.caller
            .mutation(
                h.user("u1"),
                "todoCategory.update",
                json!({ "id": created.id.to_string(), "name": "Office" }),
            )
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(updated.name, "Office");
    assert_eq!(updated.color, "#abc");
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn test_foreign_category_is_not_found() {
    let h = Harness::new(&[]);
    let created = h
        .caller
        .mutation(h.user("u1"), "todoCategory.create", json!({ "name": "Mine" }))
        .await
        .unwrap();
    let id = created["id"].clone();

    let err = h
        .caller
        .mutation(h.user("u2"), "todoCategory.update", json!({ "id": id, "name": "Stolen" }))
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::NotFound);

    let err = h
        .caller
        .mutation(h.user("u2"), "todoCategory.delete", json!({ "id": id }))
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::NotFound);

    let listed: Vec<Category> = h
        .caller
        .query_as(h.user("u2"), "todoCategory.list", Value::Null)
        .await
        .unwrap();
    assert!(listed.is_empty());

    h.caller
        .mutation(h.user("u1"), "todoCategory.delete", json!({ "id": id }))
        .await
        .unwrap();
    let err = h
        .caller
        .mutation(h.user("u1"), "todoCategory.delete", json!({ "id": id }))
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_malformed_id_is_validation_error() {
    let h = Harness::new(&[]);
    let err = h
        .caller
        .mutation(h.user("u1"), "todoCategory.delete", json!({ "id": "not-a-uuid" }))
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::ValidationFailed);
}

// ---------------------------------------------------------------------------
// scrapBook.*
// ---------------------------------------------------------------------------

async fn seed_book(h: &Harness, owner: &str, title: &str, is_public: bool) -> ScrapBook {
    let book = ScrapBook {
        id: ScrapBookId::new(),
        owner: UserId::new(owner),
        title: title.into(),
        description: None,
        scrap_count: 0,
        is_public,
        created_at: Utc::now(),
    };
    h.store.save_scrap_book(&book).await.unwrap();
    book
}

#[tokio::test]
async fn test_scrap_book_visibility() {
    let h = Harness::new(&[]);
    let private = seed_book(&h, "u1", "Diary", false).await;
    let shared = seed_book(&h, "u1", "Recipes", true).await;

    let got: ScrapBook = serde_json::from_value(
        h.caller
            .query(h.anon(), "scrapBook.get", json!({ "id": shared.id.to_string() }))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(got, shared);

    let err = h
        .caller
        .query(h.user("u2"), "scrapBook.get", json!({ "id": private.id.to_string() }))
        .await
        .unwrap_err();
    assert_eq!(code(&err), ErrorCode::NotFound);

    h.caller
        .query(h.user("u1"), "scrapBook.get", json!({ "id": private.id.to_string() }))
        .await
        .unwrap();

    let public: Vec<ScrapBook> = h
        .caller
        .query_as(h.anon(), "scrapBook.public", Value::Null)
        .await
        .unwrap();
    assert_eq!(public, vec![shared]);

    let mine: Vec<ScrapBook> = h
        .caller
        .query_as(h.user("u1"), "scrapBook.list", Value::Null)
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let err = h
        .caller
        .query(h.anon(), "scrapBook.list", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err, ProcedureError::Unauthenticated);
}
