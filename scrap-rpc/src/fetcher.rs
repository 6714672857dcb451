//! HTTP feed fetcher reading JSON Feed 1.1 documents.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use scrap_core::{FeedFetchError, FeedFetcher, FeedItem, FeedSource};

#[derive(Debug, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    date_published: Option<DateTime<Utc>>,
}

/// Fetches `source.url` and maps the document's `items`.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FeedFetchError> {
        let builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scrap-rpc/", env!("CARGO_PKG_VERSION")));
        let builder = if cfg!(test) {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder
            .build()
            .map_err(|e| FeedFetchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, err: reqwest::Error) -> FeedFetchError {
        if err.is_timeout() {
            FeedFetchError::Timeout(self.timeout.as_secs())
        } else if let Some(status) = err.status() {
            FeedFetchError::Status(status.as_u16())
        } else if err.is_decode() {
            FeedFetchError::Payload(err.to_string())
        } else {
            FeedFetchError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FeedFetchError> {
        let response = self
            .client
            .get(&source.url)
            .header(reqwest::header::ACCEPT, "application/feed+json, application/json")
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| self.map_error(e))?;
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        let items = parse_json_feed(source, &body)?;
        tracing::debug!(source = %source.name, items = items.len(), "fetched feed");
        Ok(items)
    }
}

/// Map a JSON Feed document to items of `source`.
///
/// An item without a title falls back to its url, then its id. Items whose
/// id is empty are skipped.
pub fn parse_json_feed(source: &FeedSource, body: &[u8]) -> Result<Vec<FeedItem>, FeedFetchError> {
    let feed: JsonFeed =
        serde_json::from_slice(body).map_err(|e| FeedFetchError::Payload(e.to_string()))?;
    Ok(feed
        .items
        .into_iter()
        .filter(|item| !item.id.is_empty())
        .map(|item| {
            let url = item.url.unwrap_or_default();
            let title = item
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| if url.is_empty() { item.id.clone() } else { url.clone() });
            FeedItem {
                id: item.id,
                source_id: source.id,
                title,
                url,
                published_at: item.date_published,
            }
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use scrap_core::FeedSourceId;

    fn source() -> FeedSource {
        FeedSource {
            id: FeedSourceId::new(),
            name: "blog".into(),
            url: "https://example.com/feed.json".into(),
            owner: None,
        }
    }

    #[test]
    fn test_parse_items() {
        let source = source();
        let body = br#"{
            "version": "https://jsonfeed.org/version/1.1",
            "title": "Blog",
            "items": [
                {"id": "1", "title": "Hello", "url": "https://example.com/1",
                 "date_published": "2026-03-01T10:00:00Z"},
                {"id": "2", "url": "https://example.com/2"},
                {"id": "", "title": "skipped"}
            ]
        }"#;
        let items = parse_json_feed(&source, body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Hello");
        assert!(items[0].published_at.is_some());
        assert_eq!(items[1].title, "https://example.com/2");
        assert!(items.iter().all(|i| i.source_id == source.id));
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_json_feed(&source(), b"<rss/>").unwrap_err();
        assert!(matches!(err, FeedFetchError::Payload(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let fetcher = HttpFeedFetcher::new(Duration::from_secs(2)).unwrap();
        let mut source = source();
        source.url = "http://127.0.0.1:1/feed.json".into();
        let err = fetcher.fetch(&source).await.unwrap_err();
        assert!(matches!(
            err,
            FeedFetchError::Request(_) | FeedFetchError::Timeout(_)
        ));
    }
}
