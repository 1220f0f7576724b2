//! Search results.

use crate::{
    document::{Document, DocumentCollection},
    field_map::FieldMap,
    transport::RawResponse,
};
use serde_json::Value;

/// Outcome of one logical search, one-shot or aggregated over a scroll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    documents: DocumentCollection,
    time: u64,
    total_hits: u64,
}

impl SearchResult {
    /// Create a result.
    pub fn new(documents: DocumentCollection, time: u64, total_hits: u64) -> Self {
        Self {
            documents,
            time,
            total_hits,
        }
    }

    /// The returned documents.
    pub fn documents(&self) -> &DocumentCollection {
        &self.documents
    }

    /// Engine-reported time in milliseconds.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Total matching documents. May exceed [`SearchResult::count`] when the
    /// query limited its page size.
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// Number of returned documents.
    pub fn count(&self) -> usize {
        self.documents.count()
    }

    /// Take the documents out.
    pub fn into_documents(self) -> DocumentCollection {
        self.documents
    }
}

/// One page of hits as returned by a search or scroll request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Hits mapped to documents, in engine order.
    pub documents: Vec<Document>,
    /// `took` in milliseconds.
    pub time: u64,
    /// Total matching documents.
    pub total_hits: u64,
    /// Cursor to advance, when the request opened a scroll.
    pub scroll_id: Option<String>,
}

impl ResultSet {
    /// Parse the body of a validated search response.
    ///
    /// `hits.total` is read both as a plain number and as
    /// `{ "value": n, "relation": .. }`. A hit without `_source` maps to an
    /// empty field map.
    pub fn from_response(response: &RawResponse) -> Self {
        let body = &response.body;
        let hits = &body["hits"];

        let total_hits = match &hits["total"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            total => total["value"].as_u64().unwrap_or(0),
        };

        let documents = hits["hits"]
            .as_array()
            .map(|hits| hits.iter().map(map_hit).collect())
            .unwrap_or_default();

        Self {
            documents,
            time: body["took"].as_u64().unwrap_or(0),
            total_hits,
            scroll_id: body["_scroll_id"].as_str().map(str::to_string),
        }
    }

    /// Number of hits on this page.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the page has no hits.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Convert into a [`SearchResult`] keeping the reported time and total.
    pub fn into_search_result(self) -> SearchResult {
        SearchResult::new(self.documents.into(), self.time, self.total_hits)
    }
}

fn map_hit(hit: &Value) -> Document {
    let id = match &hit["_id"] {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };

    let data = match &hit["_source"] {
        Value::Object(fields) => FieldMap::from_map(fields.clone()),
        _ => FieldMap::new(),
    };

    Document::new(id, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> RawResponse {
        RawResponse::ok(json!({
            "took": 7,
            "_scroll_id": "cursor-1",
            "hits": {
                "total": { "value": 12345, "relation": "eq" },
                "hits": [
                    { "_id": "b", "_source": { "name": "John Smith" } },
                    { "_id": "a", "_source": { "name": "John Doe" } },
                    { "_id": "c" }
                ]
            }
        }))
    }

    #[test]
    fn test_parse_preserves_order() {
        let set = ResultSet::from_response(&page());
        let ids: Vec<&str> = set.documents.iter().map(|d| d.id().unwrap()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(set.time, 7);
        assert_eq!(set.total_hits, 12345);
        assert_eq!(set.scroll_id.as_deref(), Some("cursor-1"));
        assert!(set.documents[2].data().is_empty());
    }

    #[test]
    fn test_parse_legacy_numeric_total() {
        let response = RawResponse::ok(json!({ "took": 1, "hits": { "total": 3, "hits": [] } }));
        let set = ResultSet::from_response(&response);
        assert_eq!(set.total_hits, 3);
        assert!(set.is_empty());
        assert!(set.scroll_id.is_none());
    }

    #[test]
    fn test_parse_empty_body() {
        let set = ResultSet::from_response(&RawResponse::ok(Value::Null));
        assert_eq!(set, ResultSet::default());
    }

    #[test]
    fn test_search_result_counts() {
        let result = ResultSet::from_response(&page()).into_search_result();
        assert_eq!(result.count(), 3);
        assert_eq!(result.count(), result.documents().count());
        assert_eq!(result.total_hits(), 12345);
        assert_eq!(result.time(), 7);
    }
}
