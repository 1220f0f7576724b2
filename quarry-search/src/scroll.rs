//! Scroll cursor draining.

use crate::{
    error::{DalError, Result},
    response::check_response,
    result::ResultSet,
    transport::Transport,
};
use quarry_log::{debug, warn};
use serde_json::Value;

/// Server-side cursor, advanced one batch at a time.
///
/// The first call to [`Scroll::next_batch`] opens the cursor; later calls
/// advance it. Once a batch comes back empty (or without a cursor id) the
/// scroll is finished and yields `None` forever. It cannot be restarted.
pub struct Scroll<'a> {
    transport: &'a dyn Transport,
    index: &'a str,
    body: Option<Value>,
    expiry: &'a str,
    scroll_id: Option<String>,
    finished: bool,
}

impl<'a> Scroll<'a> {
    /// Prepare a cursor for `body`. Nothing is sent until the first batch.
    pub fn new(transport: &'a dyn Transport, index: &'a str, body: Value, expiry: &'a str) -> Self {
        Self {
            transport,
            index,
            body: Some(body),
            expiry,
            scroll_id: None,
            finished: false,
        }
    }

    /// Fetch the next non-empty batch, or `None` when drained.
    pub async fn next_batch(&mut self) -> Result<Option<ResultSet>> {
        if self.finished {
            return Ok(None);
        }

        let response = match (self.body.take(), &self.scroll_id) {
            (Some(body), _) => {
                self.transport
                    .search(self.index, body, Some(self.expiry))
                    .await?
            }
            (None, Some(scroll_id)) => self.transport.scroll(scroll_id, self.expiry).await?,
            (None, None) => {
                self.finished = true;
                return Ok(None);
            }
        };

        if let Err(e) = check_response(&response) {
            self.finished = true;
            return Err(e);
        }

        let batch = ResultSet::from_response(&response);
        if batch.scroll_id.is_some() {
            self.scroll_id = batch.scroll_id.clone();
        }

        if batch.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        if batch.scroll_id.is_none() {
            // Without a cursor id there is nothing left to advance.
            self.finished = true;
        }

        debug!("Scroll on {} returned {} hits", self.index, batch.len());
        Ok(Some(batch))
    }

    /// Whether the cursor has been drained.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Release the server-side cursor. Failures are logged, not returned.
    pub async fn clear(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };

        match self.transport.clear_scroll(&scroll_id).await {
            Ok(response) if response.is_ok() => {}
            Ok(response) => warn!("Failed to clear scroll (status: {})", response.status),
            Err(e) => warn!("Failed to clear scroll: {}", e),
        }
    }
}

/// Everything a drained scroll produced.
#[derive(Debug, Default)]
pub struct Drained {
    /// All batches concatenated in arrival order.
    pub batches: Vec<ResultSet>,
    /// Sum of the batches' `took`.
    pub time: u64,
}

/// Drain `scroll`, failing once more than `max_batches` non-empty batches
/// have been fetched. The cursor is cleared on every exit path.
pub async fn drain(scroll: &mut Scroll<'_>, max_batches: usize) -> Result<Drained> {
    let result = collect(scroll, max_batches).await;
    scroll.clear().await;
    result
}

async fn collect(scroll: &mut Scroll<'_>, max_batches: usize) -> Result<Drained> {
    let mut drained = Drained::default();

    while let Some(batch) = scroll.next_batch().await? {
        if drained.batches.len() >= max_batches {
            return Err(DalError::ScrollLimit {
                batches: drained.batches.len(),
            });
        }
        drained.time += batch.time;
        drained.batches.push(batch);
    }

    Ok(drained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, TransportCall};
    use crate::transport::RawResponse;
    use serde_json::json;

    fn page(scroll_id: &str, took: u64, ids: &[&str]) -> RawResponse {
        let hits: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "_id": id, "_source": { "id": id } }))
            .collect();
        RawResponse::ok(json!({
            "_scroll_id": scroll_id,
            "took": took,
            "hits": { "total": { "value": 99 }, "hits": hits }
        }))
    }

    #[tokio::test]
    async fn test_drains_until_empty_page() {
        let transport = MockTransport::new()
            .with_search(page("s1", 3, &["a", "b"]))
            .with_scroll(page("s2", 4, &["c"]))
            .with_scroll(page("s2", 1, &[]));

        let mut scroll = Scroll::new(&transport, "users", json!({}), "1m");
        let drained = drain(&mut scroll, 10).await.unwrap();

        assert_eq!(drained.batches.len(), 2);
        assert_eq!(drained.time, 7);
        assert!(scroll.is_finished());
        assert_eq!(scroll.next_batch().await.unwrap(), None);

        let calls = transport.calls();
        assert_eq!(
            calls.last(),
            Some(&TransportCall::ClearScroll {
                scroll_id: "s2".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_stops_when_cursor_id_missing() {
        let transport = MockTransport::new().with_search(RawResponse::ok(json!({
            "took": 2,
            "hits": { "hits": [{ "_id": "a", "_source": {} }] }
        })));

        let mut scroll = Scroll::new(&transport, "users", json!({}), "1m");
        let drained = drain(&mut scroll, 10).await.unwrap();

        assert_eq!(drained.batches.len(), 1);
        assert_eq!(transport.count_calls("scroll"), 0);
        assert_eq!(transport.count_calls("clear_scroll"), 0);
    }

    #[tokio::test]
    async fn test_batch_cap() {
        let transport = MockTransport::new()
            .with_search(page("s1", 1, &["a"]))
            .with_scroll(page("s1", 1, &["b"]))
            .with_scroll(page("s1", 1, &["c"]));

        let mut scroll = Scroll::new(&transport, "users", json!({}), "1m");
        let err = drain(&mut scroll, 2).await.unwrap_err();

        assert!(matches!(err, DalError::ScrollLimit { batches: 2 }));
        assert_eq!(transport.count_calls("clear_scroll"), 1);
    }

    #[tokio::test]
    async fn test_rejected_advance_fails() {
        let transport = MockTransport::new()
            .with_search(page("s1", 1, &["a"]))
            .with_scroll(RawResponse::new(404, json!({})));

        let mut scroll = Scroll::new(&transport, "users", json!({}), "1m");
        let err = drain(&mut scroll, 10).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(scroll.is_finished());
    }
}
