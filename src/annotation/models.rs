//! Annotation entity types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::codec::{SchemaError, is_reserved_key};

/// Permission entry that grants an action to every identity.
pub const EVERYONE: &str = "group:__world__";

/// Action gated by the authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("Unknown action: {}", other)),
        }
    }
}

/// A positional locator within the annotated document.
///
/// Client keys beyond the locator fields ride along in `extra` and are
/// emitted after them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Option<String>,
    #[serde(rename = "startOffset")]
    pub start_offset: Option<i64>,
    pub end: Option<String>,
    #[serde(rename = "endOffset")]
    pub end_offset: Option<i64>,
    pub id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Range {
    pub fn new(start: &str, start_offset: i64, end: &str, end_offset: i64) -> Self {
        Self {
            start: Some(start.to_string()),
            start_offset: Some(start_offset),
            end: Some(end.to_string()),
            end_offset: Some(end_offset),
            id: None,
            extra: Map::new(),
        }
    }
}

struct OrNone<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrNone<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => v.fmt(f),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Range {} {}@{} {}@{}>",
            OrNone(&self.id),
            OrNone(&self.start),
            OrNone(&self.start_offset),
            OrNone(&self.end),
            OrNone(&self.end_offset)
        )
    }
}

/// Per-action lists of authorized identities.
///
/// Absent (or empty) entries fall back to the policy default. Entries for
/// actions this service does not gate are kept verbatim in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Permissions {
    /// The explicit entry for `action`, if one is set and non-empty.
    pub fn entry(&self, action: Action) -> Option<&[String]> {
        let list = match action {
            Action::Read => self.read.as_deref(),
            Action::Update => self.update.as_deref(),
            Action::Delete => self.delete.as_deref(),
        };
        list.filter(|l| !l.is_empty())
    }

    pub fn set(&mut self, action: Action, users: Vec<String>) {
        let slot = match action {
            Action::Read => &mut self.read,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        };
        *slot = Some(users);
    }
}

/// Client-supplied fields outside the canonical schema.
///
/// Insertion-ordered. Never holds a canonical or reserved key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Extras(Map<String, Value>);

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, refusing canonical and reserved names.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>, SchemaError> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(SchemaError::ReservedKey(key));
        }
        Ok(self.0.insert(key, value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite with every field of `other`, keeping fields it does not name.
    pub fn merge(&mut self, other: Extras) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    /// Opaque text form used by persistent stores.
    pub fn to_blob(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Decode the text form written by [`Extras::to_blob`].
    pub fn from_blob(blob: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(blob).map_err(|e| SchemaError::InvalidField {
            field: "extras",
            reason: e.to_string(),
        })?;
        let Value::Object(map) = value else {
            return Err(SchemaError::InvalidField {
                field: "extras",
                reason: "not a JSON object".into(),
            });
        };
        let mut extras = Extras::new();
        for (k, v) in map {
            extras.insert(k, v)?;
        }
        Ok(extras)
    }
}

/// The protected resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// Store-assigned; immutable once set.
    pub id: Option<i64>,
    pub text: Option<String>,
    /// Identity that created the record.
    pub user: Option<String>,
    pub ranges: Vec<Range>,
    pub permissions: Option<Permissions>,
    pub extras: Extras,
}

impl Annotation {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Annotation {} \"{}\">",
            OrNone(&self.id),
            OrNone(&self.text)
        )
    }
}
