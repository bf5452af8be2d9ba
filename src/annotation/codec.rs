//! Wire codec for annotations.
//!
//! The wire form is one flat JSON object. Canonical keys map onto typed
//! fields. Every other key is an extra, kept verbatim and emitted again
//! next to the canonical keys. `extras` itself is never a wire key.

use serde_json::{Map, Value};
use thiserror::Error;

use super::models::{Annotation, Extras, Permissions, Range};

/// Keys with a typed home on [`Annotation`].
pub const CANONICAL_KEYS: [&str; 5] = ["id", "text", "ranges", "user", "permissions"];

/// Keys a client may not use for extras.
pub const RESERVED_KEYS: [&str; 1] = ["extras"];

pub(crate) fn is_reserved_key(key: &str) -> bool {
    CANONICAL_KEYS.contains(&key) || RESERVED_KEYS.contains(&key)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Annotation payload must be a JSON object")]
    NotAnObject,

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("'{0}' is a reserved field name")]
    ReservedKey(String),
}

/// A decoded wire object: the fields it supplied, nothing more.
///
/// The outer `Option` on each canonical field tells "not supplied" apart
/// from "supplied as null".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub id: Option<Option<i64>>,
    pub text: Option<Option<String>>,
    pub user: Option<Option<String>>,
    pub ranges: Option<Vec<Range>>,
    pub permissions: Option<Option<Permissions>>,
    pub extras: Extras,
}

impl AnnotationPatch {
    /// True when the payload named no field at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.text.is_none()
            && self.user.is_none()
            && self.ranges.is_none()
            && self.permissions.is_none()
            && self.extras.is_empty()
    }

    /// Apply to a stored record. `id` and `user` are left untouched; ranges
    /// are replaced wholesale; extras are overwritten key by key.
    pub fn apply(self, annotation: &mut Annotation) {
        if let Some(text) = self.text {
            annotation.text = text;
        }
        if let Some(ranges) = self.ranges {
            annotation.ranges = ranges;
        }
        if let Some(permissions) = self.permissions {
            annotation.permissions = permissions;
        }
        annotation.extras.merge(self.extras);
    }

    /// Build a fresh record carrying every supplied field, `id` and `user`
    /// included.
    pub fn into_annotation(self) -> Annotation {
        let mut annotation = Annotation {
            id: self.id.flatten(),
            user: self.user.clone().flatten(),
            ..Annotation::default()
        };
        self.apply(&mut annotation);
        annotation
    }
}

/// Encode an annotation as its flat wire object.
///
/// `id` and `text` are always present, as `null` when unset.
/// `user` and `permissions` appear only when set, so a supplied `null` for
/// either reads back as an absent key.
pub fn to_wire(annotation: &Annotation) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("id".into(), annotation.id.map_or(Value::Null, Value::from));
    out.insert(
        "text".into(),
        annotation
            .text
            .as_ref()
            .map_or(Value::Null, |t| Value::String(t.clone())),
    );
    out.insert(
        "ranges".into(),
        Value::Array(
            annotation
                .ranges
                .iter()
                .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
                .collect(),
        ),
    );
    if let Some(user) = &annotation.user {
        out.insert("user".into(), Value::String(user.clone()));
    }
    if let Some(permissions) = &annotation.permissions {
        out.insert(
            "permissions".into(),
            serde_json::to_value(permissions).unwrap_or(Value::Null),
        );
    }
    for (k, v) in annotation.extras.iter() {
        out.insert(k.clone(), v.clone());
    }
    out
}

/// Decode a wire value into the patch it describes.
pub fn from_wire(value: &Value) -> Result<AnnotationPatch, SchemaError> {
    match value {
        Value::Object(obj) => from_wire_object(obj),
        _ => Err(SchemaError::NotAnObject),
    }
}

pub fn from_wire_object(obj: &Map<String, Value>) -> Result<AnnotationPatch, SchemaError> {
    let mut patch = AnnotationPatch::default();

    for (key, value) in obj {
        match key.as_str() {
            "id" => patch.id = Some(decode_id(value)?),
            "text" => patch.text = Some(decode_string("text", value)?),
            "user" => patch.user = Some(decode_string("user", value)?),
            "ranges" => patch.ranges = Some(decode_ranges(value)?),
            "permissions" => patch.permissions = Some(decode_permissions(value)?),
            _ => {
                patch.extras.insert(key.clone(), value.clone())?;
            }
        }
    }

    Ok(patch)
}

fn decode_id(value: &Value) -> Result<Option<i64>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_i64().map(Some).ok_or_else(|| SchemaError::InvalidField {
            field: "id",
            reason: format!("expected an integer, got {}", n),
        }),
        other => Err(SchemaError::InvalidField {
            field: "id",
            reason: format!("expected an integer, got {}", other),
        }),
    }
}

fn decode_string(field: &'static str, value: &Value) -> Result<Option<String>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(SchemaError::InvalidField {
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn decode_ranges(value: &Value) -> Result<Vec<Range>, SchemaError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(SchemaError::InvalidField {
                field: "ranges",
                reason: format!("expected an array, got {}", other),
            });
        }
    };

    items
        .iter()
        .map(|item| {
            if !item.is_object() {
                return Err(SchemaError::InvalidField {
                    field: "ranges",
                    reason: "each range must be an object".into(),
                });
            }
            serde_json::from_value(item.clone()).map_err(|e| SchemaError::InvalidField {
                field: "ranges",
                reason: e.to_string(),
            })
        })
        .collect()
}

fn decode_permissions(value: &Value) -> Result<Option<Permissions>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| SchemaError::InvalidField {
                field: "permissions",
                reason: e.to_string(),
            }),
        other => Err(SchemaError::InvalidField {
            field: "permissions",
            reason: format!("expected an object, got {}", other),
        }),
    }
}
