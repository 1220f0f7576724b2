// Quarry - A typed data access layer for OpenSearch and Elasticsearch
//
// This library wraps one index behind counting, searching, exhaustive
// scroll retrieval, lookup by id and bulk mutations, with every engine
// response validated before it reaches the caller.

// Re-export the data access layer
pub use quarry_search::*;

// Re-export logging
pub use quarry_log as log;

// Re-export JSON helpers used to build documents and scripts
pub use serde_json::{Value, json};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DalError,
        Dbal,
        DbalBuilder,
        Document,
        DocumentCollection,
        FieldMap,
        QuarryConfig,
        Query,
        Result,
        Script,
        SearchQuery,
        SearchResult,
        SortOrder,
        // Transport seam
        RawResponse,
        Transport,
        json,
    };
}
