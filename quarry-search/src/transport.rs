//! Transport seam between the data access layer and the search engine.

use crate::{
    config::QuarryConfig,
    error::{DalError, Result},
};
use async_trait::async_trait;
use opensearch::{
    BulkParts, ClearScrollParts, OpenSearch, ScrollParts, SearchParts, UpdateByQueryParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::IndicesRefreshParts,
    params::Refresh,
};
use quarry_log::{debug, info};
use serde_json::{Value, json};
use std::sync::Arc;

/// Raw engine response: HTTP status plus decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body, `Value::Null` when the body was empty or not JSON.
    pub body: Value,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// A `200 OK` response with `body`.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Whether the engine accepted the request.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Visibility guarantee requested from a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Return without waiting.
    #[default]
    None,
    /// Return once the change is visible to searches.
    WaitFor,
    /// Force an immediate refresh.
    Immediate,
}

/// Primitives the data access layer is built from.
///
/// Implementations return transport errors only for I/O failures; a request
/// the engine rejects is a [`RawResponse`] with a non-2xx status.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a search. With `scroll` set, a cursor is opened for that long.
    async fn search(&self, index: &str, body: Value, scroll: Option<&str>) -> Result<RawResponse>;

    /// Advance an open cursor.
    async fn scroll(&self, scroll_id: &str, expiry: &str) -> Result<RawResponse>;

    /// Release an open cursor.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<RawResponse>;

    /// Send newline-delimited bulk actions.
    async fn bulk(&self, index: &str, lines: Vec<Value>, refresh: RefreshPolicy)
    -> Result<RawResponse>;

    /// Run a script against every document matching `body["query"]`.
    async fn update_by_query(&self, index: &str, body: Value, refresh: bool)
    -> Result<RawResponse>;

    /// Make recent writes visible to searches.
    async fn refresh(&self, index: &str) -> Result<RawResponse>;
}

/// [`Transport`] backed by the `opensearch` crate.
#[derive(Clone)]
pub struct OpenSearchTransport {
    client: Arc<OpenSearch>,
    url: String,
}

impl OpenSearchTransport {
    /// Connect to the first URL of `config`.
    pub fn new(config: &QuarryConfig) -> Result<Self> {
        info!("Initializing OpenSearch transport for: {:?}", config.urls);

        let raw_url = config
            .urls
            .first()
            .ok_or_else(|| DalError::InvalidArgument("no URLs provided".to_string()))?;

        let url = opensearch::http::Url::parse(raw_url)
            .map_err(|e| DalError::InvalidArgument(format!("invalid URL: {}", e)))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(config.request_timeout)
            .disable_proxy();

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder =
                builder.auth(opensearch::auth::Credentials::Basic(user.clone(), pass.clone()));
        }

        let transport = builder
            .build()
            .map_err(|e| DalError::Connection(e.to_string()))?;

        debug!("OpenSearch transport initialized");

        Ok(Self {
            client: Arc::new(OpenSearch::new(transport)),
            url: raw_url.clone(),
        })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: OpenSearch) -> Self {
        Self {
            client: Arc::new(client),
            url: String::new(),
        }
    }

    /// The underlying client.
    pub fn inner(&self) -> &OpenSearch {
        &self.client
    }

    async fn into_raw(response: Response) -> Result<RawResponse> {
        let status = response.status_code().as_u16();
        let text = response.text().await?;
        decode_body(status, &text)
    }
}

/// Decode a response body.
///
/// An empty body reads as `Value::Null`. An accepted response whose body is
/// not JSON fails with [`DalError::Serialization`]; a rejected one keeps a
/// null body so the status still surfaces as a query failure.
fn decode_body(status: u16, text: &str) -> Result<RawResponse> {
    if text.trim().is_empty() {
        return Ok(RawResponse::new(status, Value::Null));
    }

    let response = match serde_json::from_str(text) {
        Ok(body) => RawResponse::new(status, body),
        Err(_) if !(200..300).contains(&status) => RawResponse::new(status, Value::Null),
        Err(e) => return Err(e.into()),
    };
    Ok(response)
}

#[async_trait]
impl Transport for OpenSearchTransport {
    async fn search(&self, index: &str, body: Value, scroll: Option<&str>) -> Result<RawResponse> {
        let indices = [index];
        let mut request = self.client.search(SearchParts::Index(&indices)).body(body);
        if let Some(expiry) = scroll {
            request = request.scroll(expiry);
        }
        Self::into_raw(request.send().await?).await
    }

    async fn scroll(&self, scroll_id: &str, expiry: &str) -> Result<RawResponse> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({ "scroll": expiry, "scroll_id": scroll_id }))
            .send()
            .await?;
        Self::into_raw(response).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<RawResponse> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await?;
        Self::into_raw(response).await
    }

    async fn bulk(
        &self,
        index: &str,
        lines: Vec<Value>,
        refresh: RefreshPolicy,
    ) -> Result<RawResponse> {
        let body: Vec<JsonBody<Value>> = lines.into_iter().map(JsonBody::from).collect();
        let mut request = self.client.bulk(BulkParts::Index(index)).body(body);
        request = match refresh {
            RefreshPolicy::None => request,
            RefreshPolicy::WaitFor => request.refresh(Refresh::WaitFor),
            RefreshPolicy::Immediate => request.refresh(Refresh::True),
        };
        Self::into_raw(request.send().await?).await
    }

    async fn update_by_query(
        &self,
        index: &str,
        body: Value,
        refresh: bool,
    ) -> Result<RawResponse> {
        let indices = [index];
        let response = self
            .client
            .update_by_query(UpdateByQueryParts::Index(&indices))
            .refresh(refresh)
            .body(body)
            .send()
            .await?;
        Self::into_raw(response).await
    }

    async fn refresh(&self, index: &str) -> Result<RawResponse> {
        let indices = [index];
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&indices))
            .send()
            .await?;
        Self::into_raw(response).await
    }
}

impl std::fmt::Debug for OpenSearchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchTransport")
            .field("url", &self.url)
            .finish()
    }
}
