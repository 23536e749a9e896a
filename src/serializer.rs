//! Body serializers. JSON is the default; a node may override it.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

type SerializeFn = dyn Fn(&Map<String, Value>) -> Vec<u8> + Send + Sync;

#[derive(Clone, Default)]
pub enum Serializer {
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`; arrays repeat the key.
    Form,
    Custom {
        content_type: String,
        encode: Arc<SerializeFn>,
    },
}

impl Serializer {
    pub fn custom<F>(content_type: impl Into<String>, encode: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Vec<u8> + Send + Sync + 'static,
    {
        Serializer::Custom {
            content_type: content_type.into(),
            encode: Arc::new(encode),
        }
    }

    /// Look up a built-in serializer by name (`json`, `form`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Serializer::Json),
            "form" | "urlencoded" => Some(Serializer::Form),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Serializer::Json => JSON_CONTENT_TYPE,
            Serializer::Form => FORM_CONTENT_TYPE,
            Serializer::Custom { content_type, .. } => content_type,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Serializer::Json)
    }

    pub fn serialize(&self, body: &Map<String, Value>) -> Vec<u8> {
        match self {
            // Serializing a map of JSON values cannot fail.
            Serializer::Json => serde_json::to_vec(body).unwrap_or_default(),
            Serializer::Form => {
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                for (k, v) in body {
                    match v {
                        Value::Array(items) => {
                            for item in items {
                                form.append_pair(k, &scalar_text(item));
                            }
                        }
                        other => {
                            form.append_pair(k, &scalar_text(other));
                        }
                    }
                }
                form.finish().into_bytes()
            }
            Serializer::Custom { encode, .. } => encode(body),
        }
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serializer::Json => f.write_str("Json"),
            Serializer::Form => f.write_str("Form"),
            Serializer::Custom { content_type, .. } => {
                write!(f, "Custom({content_type})")
            }
        }
    }
}

impl PartialEq for Serializer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Serializer::Json, Serializer::Json) | (Serializer::Form, Serializer::Form) => true,
            (Serializer::Custom { encode: a, .. }, Serializer::Custom { encode: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}
