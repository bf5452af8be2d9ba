//! Equality-filter search over annotations.
//!
//! Query parameters other than `all_fields`, `offset` and `limit` are field
//! filters. Every filter must match. Readability is checked per record
//! before counting, so `total` never reveals records the caller cannot see.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::codec::to_wire;
use super::models::Annotation;
use super::policy::readable;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid '{param}' parameter: {value}")]
    InvalidParam { param: &'static str, value: String },
}

/// One `field == value` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        match self.field.as_str() {
            "id" => self
                .value
                .parse::<i64>()
                .is_ok_and(|wanted| annotation.id == Some(wanted)),
            "text" => annotation.text.as_deref() == Some(self.value.as_str()),
            "user" => annotation.user.as_deref() == Some(self.value.as_str()),
            "ranges" | "permissions" => false,
            field => annotation
                .extras
                .get(field)
                .is_some_and(|v| scalar_matches(v, &self.value)),
        }
    }
}

fn scalar_matches(value: &Value, wanted: &str) -> bool {
    match value {
        Value::String(s) => s == wanted,
        Value::Number(n) => n.to_string() == wanted,
        Value::Bool(b) => b.to_string() == wanted,
        _ => false,
    }
}

/// Parsed `/search` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub filters: Vec<Filter>,
    pub all_fields: bool,
    pub offset: usize,
    /// `None` means unlimited.
    pub limit: Option<usize>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            all_fields: false,
            offset: 0,
            limit: Some(DEFAULT_LIMIT),
        }
    }
}

impl SearchQuery {
    /// Build from raw query pairs, in order.
    ///
    /// `all_fields` is on when given any non-empty value. A negative `limit`
    /// lifts the limit.
    pub fn from_params(params: Vec<(String, String)>) -> Result<Self, SearchError> {
        let mut query = SearchQuery::default();

        for (key, value) in params {
            match key.as_str() {
                "all_fields" => query.all_fields = !value.is_empty(),
                "offset" => {
                    query.offset = value.parse().map_err(|_| SearchError::InvalidParam {
                        param: "offset",
                        value: value.clone(),
                    })?;
                }
                "limit" => {
                    let limit: i64 = value.parse().map_err(|_| SearchError::InvalidParam {
                        param: "limit",
                        value: value.clone(),
                    })?;
                    query.limit = usize::try_from(limit).ok();
                }
                _ => query.filters.push(Filter::new(key, value)),
            }
        }
        Ok(query)
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        self.filters.iter().all(|f| f.matches(annotation))
    }
}

/// `/search` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub total: usize,
    pub rows: Vec<Value>,
}

/// Filter, authorise, count, then page.
pub fn run_search(candidates: Vec<Annotation>, query: &SearchQuery, user: Option<&str>) -> SearchResult {
    let matching: Vec<Annotation> = candidates.into_iter().filter(|a| query.matches(a)).collect();
    let visible = readable(matching, user);
    let total = visible.len();

    let page = visible
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX));

    let rows = if query.all_fields {
        page.map(|a| Value::Object(to_wire(&a))).collect()
    } else {
        page.map(|a| {
            let mut row = Map::new();
            row.insert("id".into(), a.id.map_or(Value::Null, Value::from));
            Value::Object(row)
        })
        .collect()
    };

    SearchResult { total, rows }
}
