//! Integration tests for common Quarry workflows.
//!
//! These tests drive the facade crate the way an application would.

use async_trait::async_trait;
use quarry::log::{Format, Level, LogConfig};
use quarry::mock::MockTransport;
use quarry::prelude::*;
use quarry::{BoolQuery, RangeQuery, RefreshPolicy, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn users(transport: &MockTransport) -> Dbal {
    Dbal::builder()
        .index("users")
        .transport(transport.clone())
        .build()
        .unwrap()
}

// =============================================================================
// Document Tests
// =============================================================================

#[test]
fn test_document_from_struct() {
    #[derive(serde::Serialize)]
    struct User {
        name: String,
        age: u32,
    }

    let user = User {
        name: "John".to_string(),
        age: 42,
    };
    let document = Document::from_serializable(Some("u1".to_string()), &user).unwrap();

    assert_eq!(document.id().unwrap(), "u1");
    assert_eq!(document.data().get("age"), Some(&json!(42)));
    let keys: Vec<&String> = document.data().keys().collect();
    assert_eq!(keys, vec!["name", "age"]);
}

#[test]
fn test_document_without_id() {
    let document = Document::without_id(FieldMap::new().with("name", "John"));

    assert!(!document.has_id());
    assert!(matches!(
        document.id(),
        Err(DalError::InvariantViolation(_))
    ));
}

#[test]
fn test_collection_accessors() {
    let collection: DocumentCollection = vec![
        Document::with_id("a", FieldMap::new().with("n", 1)),
        Document::with_id("b", FieldMap::new().with("n", 2)),
    ]
    .into_iter()
    .collect();

    assert_eq!(collection.count(), 2);
    assert_eq!(collection.ids(), vec!["a", "b"]);
    assert_eq!(collection.data()[1].get("n"), Some(&json!(2)));
    assert_eq!(collection.all().len(), 2);
    assert!(DocumentCollection::default().is_empty());
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_search_query_body() {
    let query = SearchQuery::new(
        BoolQuery::new()
            .must(Query::matches("name", "john"))
            .filter(Query::term("status", "active"))
            .build(),
    )
    .sort_by("created_at", SortOrder::Desc)
    .from(20)
    .size(10);

    let body = query.to_body();
    assert_eq!(body["from"], json!(20));
    assert_eq!(body["size"], json!(10));
    assert_eq!(
        body["query"]["bool"]["filter"],
        json!([{ "term": { "status": "active" } }])
    );
    assert_eq!(body["sort"], json!([{ "created_at": { "order": "desc" } }]));
}

#[test]
fn test_script_rename() {
    let script = Script::painless("ctx._source.n += 1");
    let renamed = script.to_field_map().rename("source", "script").unwrap();

    assert!(!renamed.has("source"));
    assert_eq!(renamed.get("script"), Some(&json!("ctx._source.n += 1")));
    assert_eq!(renamed.keys().next().map(String::as_str), Some("script"));
}

// =============================================================================
// Data Access Workflows
// =============================================================================

#[tokio::test]
async fn test_write_then_read_workflow() {
    let transport = MockTransport::new()
        .with_search(RawResponse::ok(json!({
            "_scroll_id": "c1",
            "took": 3,
            "hits": {
                "total": { "value": 1 },
                "hits": [{ "_id": "u1", "_source": { "name": "John" } }]
            }
        })))
        .with_scroll(RawResponse::ok(json!({
            "_scroll_id": "c1",
            "took": 1,
            "hits": { "total": { "value": 1 }, "hits": [] }
        })));
    let dal = users(&transport);

    let document = Document::with_id("u1", FieldMap::new().with("name", "John"));
    dal.add(&document).await.unwrap();

    let found = dal.find_by_ids(&["u1"]).await.unwrap();
    assert_eq!(found.total_hits(), 1);
    assert_eq!(found.documents().first(), Some(&document));
    assert_eq!(found.time(), 4);

    assert_eq!(
        transport.call_names(),
        vec!["bulk", "refresh", "search", "scroll", "clear_scroll"]
    );
}

#[tokio::test]
async fn test_patch_and_delete_workflow() {
    let transport = MockTransport::new();
    let dal = users(&transport);

    dal.update_patch(&Document::with_id("u1", FieldMap::new().with("age", 43)))
        .await
        .unwrap();
    dal.update_by_query(
        &SearchQuery::new(Query::Range(RangeQuery::new("age").gte(40))),
        &Script::painless("ctx._source.senior = true"),
    )
    .await
    .unwrap();
    dal.delete_by_ids(&["u1"]).await.unwrap();

    assert_eq!(
        transport.call_names(),
        vec!["bulk", "refresh", "update_by_query", "refresh", "bulk", "refresh"]
    );
}

#[tokio::test]
async fn test_shared_dal_across_tasks() {
    let transport = MockTransport::new();
    let dal = users(&transport);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dal = dal.clone();
            tokio::spawn(async move {
                let document = Document::with_id(format!("u{}", i), FieldMap::new());
                dal.add(&document).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.count_calls("bulk"), 4);
    assert_eq!(transport.count_calls("refresh"), 4);
}

// =============================================================================
// Custom Transport
// =============================================================================

/// Transport that rejects everything with the same status.
struct Unavailable {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for Unavailable {
    async fn search(&self, _: &str, _: Value, _: Option<&str>) -> Result<RawResponse> {
        self.reject()
    }

    async fn scroll(&self, _: &str, _: &str) -> Result<RawResponse> {
        self.reject()
    }

    async fn clear_scroll(&self, _: &str) -> Result<RawResponse> {
        self.reject()
    }

    async fn bulk(
        &self,
        _: &str,
        _: Vec<Value>,
        _: RefreshPolicy,
    ) -> Result<RawResponse> {
        self.reject()
    }

    async fn update_by_query(&self, _: &str, _: Value, _: bool) -> Result<RawResponse> {
        self.reject()
    }

    async fn refresh(&self, _: &str) -> Result<RawResponse> {
        self.reject()
    }
}

impl Unavailable {
    fn reject(&self) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawResponse::new(503, json!({ "error": { "reason": "unavailable" } })))
    }
}

#[tokio::test]
async fn test_custom_transport_failures() {
    let transport = Arc::new(Unavailable {
        calls: AtomicUsize::new(0),
    });
    let dal = Dbal::builder()
        .index("users")
        .shared_transport(transport.clone())
        .build()
        .unwrap();

    let document = Document::with_id("u1", FieldMap::new());
    let errors = vec![
        dal.count_all().await.unwrap_err(),
        dal.search_all(&SearchQuery::match_all()).await.unwrap_err(),
        dal.find_one(&SearchQuery::match_all()).await.unwrap_err(),
        dal.add(&document).await.unwrap_err(),
        dal.refresh().await.unwrap_err(),
    ];

    for err in &errors {
        assert_eq!(err.to_string(), "query failed (status: 503)");
    }
    // no refresh follows a rejected write
    assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
}

// =============================================================================
// Configuration and Logging
// =============================================================================

#[test]
fn test_config_builders() {
    let config = QuarryConfig::new("http://search:9200", "users")
        .with_basic_auth("admin", "secret")
        .with_scroll_expiry("2m")
        .with_scroll_batch_size(500)
        .with_scroll_timeout(std::time::Duration::from_secs(30));

    assert!(config.validate().is_ok());
    assert_eq!(config.scroll_expiry, "2m");
    assert_eq!(config.scroll_batch_size, 500);
    assert_eq!(config.username.as_deref(), Some("admin"));
}

#[test]
fn test_log_rendering() {
    let config = LogConfig {
        debug: true,
        level: Level::Debug,
        format: Format::Compact,
        timestamps: false,
    };

    let line = quarry::log::render(&config, Level::Warn, "quarry_search::dbal", "scroll slow");
    assert_eq!(line, "W quarry_search::dbal: scroll slow");
}
