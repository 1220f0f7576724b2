//! Scripted transport for tests.

use crate::{
    error::Result,
    transport::{RawResponse, RefreshPolicy, Transport},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// A call received by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// `search`
    Search {
        /// Target index.
        index: String,
        /// Request body.
        body: Value,
        /// Scroll expiry, when a cursor was requested.
        scroll: Option<String>,
    },
    /// `scroll`
    Scroll {
        /// Cursor id.
        scroll_id: String,
        /// Expiry.
        expiry: String,
    },
    /// `clear_scroll`
    ClearScroll {
        /// Cursor id.
        scroll_id: String,
    },
    /// `bulk`
    Bulk {
        /// Target index.
        index: String,
        /// Request lines.
        lines: Vec<Value>,
        /// Refresh policy.
        refresh: RefreshPolicy,
    },
    /// `update_by_query`
    UpdateByQuery {
        /// Target index.
        index: String,
        /// Request body.
        body: Value,
        /// Refresh flag.
        refresh: bool,
    },
    /// `refresh`
    Refresh {
        /// Target index.
        index: String,
    },
}

impl TransportCall {
    /// Primitive name, e.g. `"bulk"`.
    pub fn name(&self) -> &'static str {
        match self {
            TransportCall::Search { .. } => "search",
            TransportCall::Scroll { .. } => "scroll",
            TransportCall::ClearScroll { .. } => "clear_scroll",
            TransportCall::Bulk { .. } => "bulk",
            TransportCall::UpdateByQuery { .. } => "update_by_query",
            TransportCall::Refresh { .. } => "refresh",
        }
    }
}

/// In-memory [`Transport`] returning queued responses and recording calls.
///
/// Each primitive has its own response queue. When a queue is empty the
/// primitive answers `200 {}`, which reads as an empty page for searches.
///
/// ```rust
/// use quarry_search::mock::MockTransport;
/// use quarry_search::{Dbal, RawResponse, SearchQuery};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let transport = MockTransport::new()
///     .with_search(RawResponse::ok(json!({ "took": 1, "hits": { "total": 42, "hits": [] } })));
/// let dal = Dbal::builder().index("users").transport(transport.clone()).build().unwrap();
///
/// assert_eq!(dal.count(&SearchQuery::match_all()).await.unwrap(), 42);
/// assert_eq!(transport.count_calls("search"), 1);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<HashMap<&'static str, VecDeque<RawResponse>>>>,
    calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl MockTransport {
    /// Transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `search`.
    pub fn with_search(self, response: RawResponse) -> Self {
        self.push("search", response)
    }

    /// Queue a response for `scroll`.
    pub fn with_scroll(self, response: RawResponse) -> Self {
        self.push("scroll", response)
    }

    /// Queue a response for `clear_scroll`.
    pub fn with_clear_scroll(self, response: RawResponse) -> Self {
        self.push("clear_scroll", response)
    }

    /// Queue a response for `bulk`.
    pub fn with_bulk(self, response: RawResponse) -> Self {
        self.push("bulk", response)
    }

    /// Queue a response for `update_by_query`.
    pub fn with_update_by_query(self, response: RawResponse) -> Self {
        self.push("update_by_query", response)
    }

    /// Queue a response for `refresh`.
    pub fn with_refresh(self, response: RawResponse) -> Self {
        self.push("refresh", response)
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock_calls().clone()
    }

    /// Number of calls to the primitive called `name`.
    pub fn count_calls(&self, name: &str) -> usize {
        self.lock_calls().iter().filter(|c| c.name() == name).count()
    }

    /// Names of the primitives called so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.lock_calls().iter().map(TransportCall::name).collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock_calls().clear();
    }

    fn push(self, name: &'static str, response: RawResponse) -> Self {
        self.lock_responses()
            .entry(name)
            .or_default()
            .push_back(response);
        self
    }

    fn answer(&self, call: TransportCall) -> Result<RawResponse> {
        let name = call.name();
        self.lock_calls().push(call);
        Ok(self
            .lock_responses()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| RawResponse::ok(json!({}))))
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<TransportCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_responses(&self) -> MutexGuard<'_, HashMap<&'static str, VecDeque<RawResponse>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn search(&self, index: &str, body: Value, scroll: Option<&str>) -> Result<RawResponse> {
        self.answer(TransportCall::Search {
            index: index.to_string(),
            body,
            scroll: scroll.map(str::to_string),
        })
    }

    async fn scroll(&self, scroll_id: &str, expiry: &str) -> Result<RawResponse> {
        self.answer(TransportCall::Scroll {
            scroll_id: scroll_id.to_string(),
            expiry: expiry.to_string(),
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<RawResponse> {
        self.answer(TransportCall::ClearScroll {
            scroll_id: scroll_id.to_string(),
        })
    }

    async fn bulk(
        &self,
        index: &str,
        lines: Vec<Value>,
        refresh: RefreshPolicy,
    ) -> Result<RawResponse> {
        self.answer(TransportCall::Bulk {
            index: index.to_string(),
            lines,
            refresh,
        })
    }

    async fn update_by_query(
        &self,
        index: &str,
        body: Value,
        refresh: bool,
    ) -> Result<RawResponse> {
        self.answer(TransportCall::UpdateByQuery {
            index: index.to_string(),
            body,
            refresh,
        })
    }

    async fn refresh(&self, index: &str) -> Result<RawResponse> {
        self.answer(TransportCall::Refresh {
            index: index.to_string(),
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.lock_calls().len())
            .finish()
    }
}
