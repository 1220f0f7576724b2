//! Bulk request encoding and response inspection.

use crate::{
    document::Document,
    error::{DalError, Result},
    transport::RawResponse,
};
use serde_json::{Value, json};

/// One action of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Insert or replace. Without an id the engine assigns one.
    Index {
        /// Target id.
        id: Option<String>,
        /// Full source.
        source: Value,
    },
    /// Partial update of an existing document.
    Update {
        /// Target id.
        id: String,
        /// Fields to merge.
        doc: Value,
    },
    /// Remove a document.
    Delete {
        /// Target id.
        id: String,
    },
}

impl BulkOperation {
    /// Index action for `document`, keeping its id when it has one.
    pub fn index(document: &Document) -> Self {
        BulkOperation::Index {
            id: document.id().ok().map(str::to_string),
            source: document.data().clone().into_value(),
        }
    }

    /// Patch action for `document`. The document must carry an id.
    pub fn update(document: &Document) -> Result<Self> {
        Ok(BulkOperation::Update {
            id: document.id()?.to_string(),
            doc: document.data().clone().into_value(),
        })
    }

    /// Delete action.
    pub fn delete(id: impl Into<String>) -> Self {
        BulkOperation::Delete { id: id.into() }
    }

    /// Action and optional source lines.
    pub fn to_bulk_lines(&self) -> Vec<Value> {
        match self {
            BulkOperation::Index { id: Some(id), source } => {
                vec![json!({ "index": { "_id": id } }), source.clone()]
            }
            BulkOperation::Index { id: None, source } => {
                vec![json!({ "index": {} }), source.clone()]
            }
            BulkOperation::Update { id, doc } => {
                vec![json!({ "update": { "_id": id } }), json!({ "doc": doc })]
            }
            BulkOperation::Delete { id } => vec![json!({ "delete": { "_id": id } })],
        }
    }
}

/// Flatten operations into request lines.
pub fn encode(operations: &[BulkOperation]) -> Vec<Value> {
    operations.iter().flat_map(BulkOperation::to_bulk_lines).collect()
}

/// Per-item outcome counts of a bulk response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    /// Items without an error.
    pub succeeded: usize,
    /// Items with an error.
    pub failed: usize,
    /// Reasons of the failed items.
    pub errors: Vec<String>,
}

impl BulkSummary {
    /// Read the `items` of a bulk response body.
    pub fn from_response(response: &RawResponse) -> Self {
        let mut summary = Self::default();

        let Some(items) = response.body["items"].as_array() else {
            return summary;
        };

        for item in items {
            let status = item
                .as_object()
                .and_then(|actions| actions.values().next());

            match status.and_then(|s| s.get("error")) {
                Some(error) => {
                    summary.failed += 1;
                    summary.errors.push(
                        error
                            .get("reason")
                            .and_then(|r| r.as_str())
                            .or_else(|| error.as_str())
                            .unwrap_or("Unknown error")
                            .to_string(),
                    );
                }
                None => summary.succeeded += 1,
            }
        }

        summary
    }

    /// Whether any item failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Fail with [`DalError::BulkFailure`] when an accepted bulk response
/// reports item errors.
pub fn check_items(response: &RawResponse) -> Result<BulkSummary> {
    let summary = BulkSummary::from_response(response);
    let flagged = response.body["errors"].as_bool().unwrap_or(false);

    if flagged || summary.has_failures() {
        return Err(DalError::BulkFailure {
            succeeded: summary.succeeded,
            failed: summary.failed,
            errors: summary.errors,
        });
    }

    Ok(summary)
}

/// Fail with [`DalError::BulkFailure`] when an accepted update-by-query
/// response lists failures, e.g. version conflicts or script errors.
pub fn check_update_failures(response: &RawResponse) -> Result<()> {
    let Some(failures) = response.body["failures"].as_array() else {
        return Ok(());
    };
    if failures.is_empty() {
        return Ok(());
    }

    let errors = failures
        .iter()
        .map(|failure| {
            failure["cause"]["reason"]
                .as_str()
                .or_else(|| failure["reason"].as_str())
                .unwrap_or("Unknown error")
                .to_string()
        })
        .collect();

    Err(DalError::BulkFailure {
        succeeded: response.body["updated"].as_u64().unwrap_or(0) as usize,
        failed: failures.len(),
        errors,
    })
}
