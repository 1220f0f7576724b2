//! Typed data access layer over an OpenSearch/Elasticsearch index.
//!
//! This crate wraps a search engine client behind a small set of operations:
//! - Counting and searching, including exhaustive scroll-based retrieval
//! - Lookup of one document or of documents by id
//! - Bulk insert, bulk patch update and update-by-query
//! - Deletion by id
//!
//! Every raw engine response is validated before it is mapped into
//! [`Document`], [`DocumentCollection`] and [`SearchResult`] values, and every
//! write is followed by an index refresh so the next read observes it.
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry_search::{Dbal, Document, FieldMap, QuarryConfig, Query, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dal = Dbal::connect(QuarryConfig::new("http://localhost:9200", "users"))?;
//!
//!     dal.add(&Document::with_id("id1", FieldMap::new().with("name", "John"))).await?;
//!
//!     let found = dal.find_by_ids(&["id1"]).await?;
//!     assert_eq!(found.total_hits(), 1);
//!
//!     let active = dal
//!         .search_all(&SearchQuery::new(Query::term("status", "active")))
//!         .await?;
//!     println!("{} active users in {} ms", active.count(), active.time());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bulk;
mod config;
mod dbal;
mod document;
mod error;
mod field_map;
mod query;
mod response;
mod result;
mod scroll;
mod transport;

pub mod mock;

pub use bulk::{BulkOperation, BulkSummary};
pub use config::{
    DEFAULT_MAX_SCROLL_BATCHES, DEFAULT_SCROLL_BATCH_SIZE, DEFAULT_SCROLL_EXPIRY, QuarryConfig,
};
pub use dbal::{DEFAULT_SCRIPT_KEY, Dbal, DbalBuilder};
pub use document::{Document, DocumentCollection};
pub use error::{DalError, Result};
pub use field_map::FieldMap;
pub use query::{BoolQuery, Query, RangeQuery, Script, SearchQuery, SortOrder};
pub use response::{check_response, error_reason};
pub use result::{ResultSet, SearchResult};
pub use scroll::Scroll;
pub use transport::{OpenSearchTransport, RawResponse, RefreshPolicy, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        DalError, Dbal, Document, DocumentCollection, FieldMap, QuarryConfig, Query, Result,
        Script, SearchQuery, SearchResult,
    };
}
