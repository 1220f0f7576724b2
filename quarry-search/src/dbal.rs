//! The data access layer.

use crate::{
    bulk::{self, BulkOperation},
    config::QuarryConfig,
    document::{Document, DocumentCollection},
    error::{DalError, Result},
    query::{Query, Script, SearchQuery},
    response::check_response,
    result::{ResultSet, SearchResult},
    scroll::{self, Scroll},
    transport::{OpenSearchTransport, RefreshPolicy, Transport},
};
use quarry_log::{debug, warn};
use serde_json::json;
use std::sync::Arc;

/// Script field name the engine expects by default.
pub const DEFAULT_SCRIPT_KEY: &str = "source";

/// Typed access to one index.
///
/// Every mutation asks the engine to wait until the change is searchable and
/// then refreshes the index, so a following read observes it. Nothing is
/// retried; a rejected request fails the whole call and skips the refresh.
#[derive(Clone)]
pub struct Dbal {
    transport: Arc<dyn Transport>,
    index: String,
    config: QuarryConfig,
}

impl Dbal {
    /// Start building a data access layer.
    pub fn builder() -> DbalBuilder {
        DbalBuilder::default()
    }

    /// Connect to the cluster described by `config`.
    pub fn connect(config: QuarryConfig) -> Result<Self> {
        config.validate()?;
        let transport = OpenSearchTransport::new(&config)?;
        Self::builder().config(config).transport(transport).build()
    }

    /// Target index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Active configuration.
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// The transport in use.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Number of documents matching `query`. The caller's page size is ignored.
    pub async fn count(&self, query: &SearchQuery) -> Result<u64> {
        Ok(self.search(&query.with_size(0)).await?.total_hits())
    }

    /// Number of documents in the index.
    pub async fn count_all(&self) -> Result<u64> {
        self.count(&SearchQuery::match_all()).await
    }

    /// Run `query` as given and map its hits.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        Ok(self.execute_query(query).await?.into_search_result())
    }

    /// Run `query` and return the validated raw page.
    pub async fn execute_query(&self, query: &SearchQuery) -> Result<ResultSet> {
        debug!("Searching index {}", self.index);

        let response = self
            .transport
            .search(&self.index, query.to_body(), None)
            .await?;
        check_response(&response)?;

        Ok(ResultSet::from_response(&response))
    }

    /// Every document matching `query`, fetched through a scroll with the
    /// configured expiry.
    pub async fn search_all(&self, query: &SearchQuery) -> Result<SearchResult> {
        self.search_all_with_expiry(query, &self.config.scroll_expiry)
            .await
    }

    /// Every document matching `query`, fetched through a scroll kept alive
    /// for `expiry` between batches.
    ///
    /// Pagination belongs to the scroll, so a query with `size` or `from`
    /// set is rejected before anything is sent. The result's time is the sum
    /// over all batches and its total hits is the number of documents
    /// actually retrieved.
    pub async fn search_all_with_expiry(
        &self,
        query: &SearchQuery,
        expiry: &str,
    ) -> Result<SearchResult> {
        if query.has_size() || query.has_from() {
            return Err(DalError::InvalidArgument(
                "please do not use from/size with search_all".to_string(),
            ));
        }

        let body = query.with_size(self.config.scroll_batch_size).to_body();
        let mut scroll = Scroll::new(self.transport.as_ref(), &self.index, body, expiry);
        let max_batches = self.config.max_scroll_batches;

        let drained = match self.config.scroll_timeout {
            Some(limit) => {
                let outcome =
                    tokio::time::timeout(limit, scroll::drain(&mut scroll, max_batches)).await;
                match outcome {
                    Ok(drained) => drained?,
                    Err(_) => {
                        warn!("Scroll on {} exceeded {:?}", self.index, limit);
                        scroll.clear().await;
                        return Err(DalError::Timeout);
                    }
                }
            }
            None => scroll::drain(&mut scroll, max_batches).await?,
        };

        let documents: DocumentCollection = drained
            .batches
            .into_iter()
            .flat_map(|batch| batch.documents)
            .collect();
        let total_hits = documents.count() as u64;

        debug!(
            "Scroll on {} retrieved {} documents",
            self.index, total_hits
        );

        Ok(SearchResult::new(documents, drained.time, total_hits))
    }

    /// First document matching `query`. At most one document is requested.
    pub async fn find_one(&self, query: &SearchQuery) -> Result<Document> {
        self.search(&query.with_size(1))
            .await?
            .into_documents()
            .into_iter()
            .next()
            .ok_or(DalError::DocumentNotFound)
    }

    /// Documents with the given ids. Unknown ids are simply absent from the
    /// result.
    pub async fn find_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<SearchResult> {
        if ids.is_empty() {
            return Err(DalError::InvalidArgument(
                "please provide at least one id".to_string(),
            ));
        }

        let query = SearchQuery::new(Query::ids(ids.iter().map(AsRef::as_ref)));
        self.search_all(&query).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Index one document.
    pub async fn add(&self, document: &Document) -> Result<()> {
        self.bulk_add(std::slice::from_ref(document)).await
    }

    /// Index documents in one bulk request. Documents without an id get one
    /// assigned by the engine; the others are upserted at their id.
    pub async fn bulk_add(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        debug!("Adding {} documents to {}", documents.len(), self.index);

        let operations: Vec<BulkOperation> =
            documents.iter().map(BulkOperation::index).collect();
        self.send_bulk(&operations).await
    }

    /// Patch one existing document.
    pub async fn update_patch(&self, document: &Document) -> Result<()> {
        self.bulk_update_patch(std::slice::from_ref(document)).await
    }

    /// Patch existing documents in one bulk request. Every document must
    /// carry an id.
    pub async fn bulk_update_patch(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let operations = documents
            .iter()
            .map(BulkOperation::update)
            .collect::<Result<Vec<_>>>()?;

        debug!("Patching {} documents in {}", operations.len(), self.index);

        self.send_bulk(&operations).await
    }

    /// Run `script` against every document matching `query`.
    pub async fn update_by_query(&self, query: &SearchQuery, script: &Script) -> Result<()> {
        self.update_by_query_with_key(query, script, DEFAULT_SCRIPT_KEY)
            .await
    }

    /// Like [`Dbal::update_by_query`], sending the script body under
    /// `script_key` instead of `source` for engines that expect another name.
    /// Only the filter part of `query` is sent.
    pub async fn update_by_query_with_key(
        &self,
        query: &SearchQuery,
        script: &Script,
        script_key: &str,
    ) -> Result<()> {
        let mut script_data = script.to_field_map();
        if script_key != DEFAULT_SCRIPT_KEY {
            script_data = script_data.rename(DEFAULT_SCRIPT_KEY, script_key)?;
        }

        let body = json!({
            "query": query.query().to_json(),
            "script": script_data.into_value(),
        });

        debug!("Updating by query in {}", self.index);

        // update-by-query accepts only true/false for refresh
        let response = self
            .transport
            .update_by_query(&self.index, body, true)
            .await?;
        check_response(&response)?;

        if let Err(e) = bulk::check_update_failures(&response) {
            warn!("Update by query on {} reported failures: {}", self.index, e);
            return Err(e);
        }

        self.refresh().await
    }

    /// Delete documents by id. An empty list does nothing.
    pub async fn delete_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        debug!("Deleting {} documents from {}", ids.len(), self.index);

        let operations: Vec<BulkOperation> = ids
            .iter()
            .map(|id| BulkOperation::delete(id.as_ref()))
            .collect();
        self.send_bulk(&operations).await
    }

    /// Make all writes so far visible to searches.
    pub async fn refresh(&self) -> Result<()> {
        let response = self.transport.refresh(&self.index).await?;
        check_response(&response)
    }

    async fn send_bulk(&self, operations: &[BulkOperation]) -> Result<()> {
        let response = self
            .transport
            .bulk(&self.index, bulk::encode(operations), RefreshPolicy::WaitFor)
            .await?;
        check_response(&response)?;

        if let Err(e) = bulk::check_items(&response) {
            warn!("Bulk request on {} reported item failures: {}", self.index, e);
            return Err(e);
        }

        self.refresh().await
    }
}

impl std::fmt::Debug for Dbal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dbal")
            .field("index", &self.index)
            .field("urls", &self.config.urls)
            .finish()
    }
}

/// Builder for [`Dbal`].
#[derive(Default)]
pub struct DbalBuilder {
    transport: Option<Arc<dyn Transport>>,
    index: Option<String>,
    config: Option<QuarryConfig>,
}

impl DbalBuilder {
    /// Use `transport` for every request.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use an already shared transport.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Target index. Overrides the index of the configuration.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Scroll and connection settings.
    pub fn config(mut self, config: QuarryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the data access layer.
    pub fn build(self) -> Result<Dbal> {
        let transport = self
            .transport
            .ok_or_else(|| DalError::InvariantViolation("transport is not set".to_string()))?;

        let mut config = self.config.unwrap_or_default();
        if let Some(index) = self.index {
            config.index = index;
        }
        config.validate()?;

        Ok(Dbal {
            transport,
            index: config.index.clone(),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_build_without_transport_fails() {
        let err = Dbal::builder().index("users").build().unwrap_err();
        assert!(matches!(err, DalError::InvariantViolation(_)));
        assert_eq!(err.to_string(), "invariant violated: transport is not set");
    }

    #[test]
    fn test_builder_index_overrides_config() {
        let dal = Dbal::builder()
            .config(QuarryConfig::new("http://es:9200", "from_config"))
            .index("override")
            .transport(MockTransport::new())
            .build()
            .unwrap();

        assert_eq!(dal.index(), "override");
        assert_eq!(dal.config().index, "override");
    }

    #[test]
    fn test_builder_validates_config() {
        let err = Dbal::builder()
            .config(QuarryConfig::default().with_scroll_batch_size(0))
            .transport(MockTransport::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, DalError::InvalidArgument(_)));
    }

    #[test]
    fn test_connect_builds_transport() {
        let dal = Dbal::connect(QuarryConfig::new("http://localhost:9200", "users")).unwrap();
        assert!(format!("{:?}", dal).contains("users"));
    }
}
