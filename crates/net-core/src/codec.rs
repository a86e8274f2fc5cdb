//! Content codec: encodes a request body value into bytes for a given
//! content-type tag.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::programmer_error;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// A request body before encoding. `Raw` bytes (or an empty body) pass
/// through verbatim; `Form` and `Json` are encoded according to the
/// content-type supplied to `encode`.
#[derive(Clone)]
pub enum Body {
    Raw(Vec<u8>),
    Form(Vec<(String, String)>),
    Json(Value),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Raw(b) if b.is_empty())
    }
}

/// Encodes `body` according to `content_type`. Raw/empty bodies pass
/// through unchanged regardless of `content_type`. Any other body
/// requires a recognized content type; an unrecognized type is a
/// programmer error (panics), matching Python's `assert` semantics.
pub fn encode(body: Body, content_type: Option<&str>) -> Vec<u8> {
    match body {
        Body::Raw(bytes) => bytes,
        Body::Form(pairs) => {
            if content_type != Some(FORM_URLENCODED) {
                programmer_error!(
                    "form body requires content type {FORM_URLENCODED}, got {content_type:?}"
                );
            }
            encode_form(&pairs)
        }
        Body::Json(value) => {
            if content_type != Some(JSON_CONTENT_TYPE) {
                programmer_error!(
                    "json body requires content type {JSON_CONTENT_TYPE}, got {content_type:?}"
                );
            }
            encode_canonical_json(&value)
        }
    }
}

fn encode_form(pairs: &[(String, String)]) -> Vec<u8> {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
        .into_bytes()
}

/// Canonical JSON: object keys sorted lexicographically, minimal
/// separators (`,` and `:`, no whitespace), byte-deterministic output.
pub fn encode_canonical_json(value: &Value) -> Vec<u8> {
    let canonical = canonicalize(value);
    serde_json::to_vec(&canonical).expect("canonical JSON value always serializes")
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
