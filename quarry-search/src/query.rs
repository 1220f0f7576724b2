//! Query values passed to the data access layer.

use crate::field_map::FieldMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Filter part of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Match all documents.
    MatchAll,
    /// Full-text match on one field.
    Match {
        /// Field name.
        field: String,
        /// Text to match.
        query: String,
    },
    /// Exact value on one field.
    Term {
        /// Field name.
        field: String,
        /// Value.
        value: Value,
    },
    /// Any of several exact values on one field.
    Terms {
        /// Field name.
        field: String,
        /// Values.
        values: Vec<Value>,
    },
    /// Documents with one of the given ids.
    Ids(Vec<String>),
    /// Numeric or date range.
    Range(RangeQuery),
    /// Boolean combination.
    Bool(BoolQuery),
    /// Raw query DSL.
    Raw(Value),
}

impl Query {
    /// `match_all`.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// `match` on `field`.
    pub fn matches(field: impl Into<String>, query: impl Into<String>) -> Self {
        Query::Match {
            field: field.into(),
            query: query.into(),
        }
    }

    /// `term` on `field`.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `terms` on `field`.
    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `ids` filter.
    pub fn ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Query::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Convert to query DSL.
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match { field, query } => json!({ "match": { field: query } }),
            Query::Term { field, value } => json!({ "term": { field: value } }),
            Query::Terms { field, values } => json!({ "terms": { field: values } }),
            Query::Ids(ids) => json!({ "ids": { "values": ids } }),
            Query::Range(r) => r.to_json(),
            Query::Bool(b) => b.to_json(),
            Query::Raw(v) => v.clone(),
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::MatchAll
    }
}

/// Range query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeQuery {
    /// Field name.
    pub field: String,
    /// Greater than.
    pub gt: Option<Value>,
    /// Greater than or equal.
    pub gte: Option<Value>,
    /// Less than.
    pub lt: Option<Value>,
    /// Less than or equal.
    pub lte: Option<Value>,
}

impl RangeQuery {
    /// Open range on `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Set greater than or equal.
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// Set less than.
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// Set greater than.
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// Set less than or equal.
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        for (name, bound) in [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ] {
            if let Some(v) = bound {
                bounds.insert(name.to_string(), v.clone());
            }
        }
        json!({ "range": { &self.field: bounds } })
    }
}

/// Bool query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    /// Must match, scoring.
    pub must: Vec<Query>,
    /// Should match.
    pub should: Vec<Query>,
    /// Must not match.
    pub must_not: Vec<Query>,
    /// Must match, non-scoring.
    pub filter: Vec<Query>,
}

impl BoolQuery {
    /// Empty bool query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause.
    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    /// Add a should clause.
    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    /// Add a must_not clause.
    pub fn must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    /// Add a filter clause.
    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    /// Wrap as a [`Query`].
    pub fn build(self) -> Query {
        Query::Bool(self)
    }

    fn to_json(&self) -> Value {
        let mut clauses = Map::new();
        for (name, queries) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ] {
            if !queries.is_empty() {
                clauses.insert(
                    name.to_string(),
                    Value::Array(queries.iter().map(Query::to_json).collect()),
                );
            }
        }
        json!({ "bool": clauses })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Complete search request owned by the caller.
///
/// The data access layer never mutates a `SearchQuery` it is handed; when it
/// needs a different page size it works on a copy from
/// [`SearchQuery::with_size`].
///
/// # Example
///
/// ```rust
/// use quarry_search::{Query, SearchQuery, SortOrder};
///
/// let query = SearchQuery::new(Query::term("status", "active"))
///     .sort_by("created_at", SortOrder::Desc)
///     .size(20);
///
/// assert!(query.has_size());
/// assert_eq!(query.to_body()["size"], 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    query: Query,
    from: Option<u64>,
    size: Option<u64>,
    sort: Vec<Value>,
    source_includes: Option<Vec<String>>,
    source_excludes: Option<Vec<String>>,
    track_total_hits: Option<bool>,
}

impl SearchQuery {
    /// Search for documents matching `query`.
    pub fn new(query: Query) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// Search matching every document.
    pub fn match_all() -> Self {
        Self::new(Query::MatchAll)
    }

    /// Set pagination offset.
    pub fn from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Set page size.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Add a sort clause.
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        let field: String = field.into();
        self.sort.push(json!({ field: { "order": order.as_str() } }));
        self
    }

    /// Return only these source fields.
    pub fn source_includes(mut self, fields: Vec<String>) -> Self {
        self.source_includes = Some(fields);
        self
    }

    /// Leave these source fields out.
    pub fn source_excludes(mut self, fields: Vec<String>) -> Self {
        self.source_excludes = Some(fields);
        self
    }

    /// Ask the engine for an exact total above 10 000 hits.
    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    /// Copy of this query with the page size replaced.
    pub fn with_size(&self, size: u64) -> Self {
        self.clone().size(size)
    }

    /// Whether a page size is set.
    pub fn has_size(&self) -> bool {
        self.size.is_some()
    }

    /// Whether an offset is set.
    pub fn has_from(&self) -> bool {
        self.from.is_some()
    }

    /// Page size, if set.
    pub fn get_size(&self) -> Option<u64> {
        self.size
    }

    /// Offset, if set.
    pub fn get_from(&self) -> Option<u64> {
        self.from
    }

    /// The filter part.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Full request body.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();

        body.insert("query".to_string(), self.query.to_json());

        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.sort.is_empty() {
            body.insert("sort".to_string(), Value::Array(self.sort.clone()));
        }

        let mut source = Map::new();
        if let Some(includes) = &self.source_includes {
            source.insert("includes".to_string(), json!(includes));
        }
        if let Some(excludes) = &self.source_excludes {
            source.insert("excludes".to_string(), json!(excludes));
        }
        if !source.is_empty() {
            body.insert("_source".to_string(), Value::Object(source));
        }

        if let Some(track) = self.track_total_hits {
            body.insert("track_total_hits".to_string(), json!(track));
        }

        Value::Object(body)
    }
}

impl From<Query> for SearchQuery {
    fn from(query: Query) -> Self {
        Self::new(query)
    }
}

/// Server-side script for update-by-query.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Script body.
    pub source: String,
    /// Script language, e.g. `painless`.
    pub lang: Option<String>,
    /// Script parameters.
    pub params: Option<FieldMap>,
}

impl Script {
    /// Script with engine-default language and no parameters.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lang: None,
            params: None,
        }
    }

    /// Painless script.
    pub fn painless(source: impl Into<String>) -> Self {
        Self::new(source).lang("painless")
    }

    /// Set the language.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Set the parameters.
    pub fn params(mut self, params: FieldMap) -> Self {
        self.params = Some(params);
        self
    }

    /// `{ "source", "lang"?, "params"? }` in that order.
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new().with("source", self.source.clone());
        if let Some(lang) = &self.lang {
            map.insert("lang", lang.clone());
        }
        if let Some(params) = &self.params {
            map.insert("params", params.clone().into_value());
        }
        map
    }
}
