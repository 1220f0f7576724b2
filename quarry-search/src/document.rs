//! Documents and document collections.

use crate::{
    error::{DalError, Result},
    field_map::FieldMap,
};
use serde::Serialize;

/// One indexed (or yet to be indexed) document.
///
/// A document without an id is sent as an auto-id insert; the engine assigns
/// the identifier.
///
/// # Example
///
/// ```rust
/// use quarry_search::{Document, FieldMap};
///
/// let doc = Document::with_id("id1", FieldMap::new().with("name", "John"));
/// assert_eq!(doc.id().unwrap(), "id1");
/// assert!(doc.data().has("name"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: Option<String>,
    data: FieldMap,
}

impl Document {
    /// Create a document.
    pub fn new(id: Option<String>, data: FieldMap) -> Self {
        Self { id, data }
    }

    /// Create a document with a known id.
    pub fn with_id(id: impl Into<String>, data: FieldMap) -> Self {
        Self::new(Some(id.into()), data)
    }

    /// Create a document the engine will assign an id to.
    pub fn without_id(data: FieldMap) -> Self {
        Self::new(None, data)
    }

    /// Create a document from a serializable value.
    pub fn from_serializable<T: Serialize>(id: Option<String>, value: &T) -> Result<Self> {
        Ok(Self::new(id, FieldMap::from_serializable(value)?))
    }

    /// The document id.
    ///
    /// Reading the id of a document that has none is a programming error and
    /// fails with [`DalError::InvariantViolation`].
    pub fn id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| DalError::InvariantViolation("document id is not set".to_string()))
    }

    /// Whether the document carries an id.
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// The document fields.
    pub fn data(&self) -> &FieldMap {
        &self.data
    }

    /// Split into id and fields.
    pub fn into_parts(self) -> (Option<String>, FieldMap) {
        (self.id, self.data)
    }
}

/// Ordered, read-only sequence of documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentCollection {
    documents: Vec<Document>,
}

impl DocumentCollection {
    /// Wrap documents in arrival order.
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Number of documents.
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    /// Alias of [`DocumentCollection::count`].
    pub fn len(&self) -> usize {
        self.count()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    /// Iterate over the documents.
    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    /// Field data of every document, in order.
    pub fn data(&self) -> Vec<&FieldMap> {
        self.documents.iter().map(Document::data).collect()
    }

    /// Ids of the documents that have one, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter_map(|d| d.id.as_deref())
            .collect()
    }

    /// First document.
    pub fn first(&self) -> Option<&Document> {
        self.documents.first()
    }

    /// Take the documents out.
    pub fn into_vec(self) -> Vec<Document> {
        self.documents
    }
}

impl From<Vec<Document>> for DocumentCollection {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

impl FromIterator<Document> for DocumentCollection {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for DocumentCollection {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentCollection {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
