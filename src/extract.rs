//! Extractors: pluggable token consumers attached to command-tree nodes.
//!
//! Kinds (constructor -> consumption):
//!   required(label)      front token, error when the buffer is empty
//!   optional(fallback)   front token, or the fallback untouched
//!   rest()               every remaining token
//!   flag(name, short)    every `--name` / `-short` anywhere; yields a count
//!   named(name, short)   every `--name VALUE` pair anywhere
//!   unparsed()           everything after a `--` sentinel
//!   custom(f)            caller-defined

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ParseError;
use crate::tokens::TokenBuffer;

/// Value produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    List(Vec<String>),
    Count(usize),
}

impl ArgValue {
    /// Structured JSON form, used for body fields.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Text(s) => Value::String(s.clone()),
            ArgValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            ArgValue::Count(n) => Value::Number((*n as u64).into()),
        }
    }

    /// Individual string values, used for query pairs.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            ArgValue::Text(s) => vec![s.clone()],
            ArgValue::List(items) => items.clone(),
            ArgValue::Count(n) => vec![n.to_string()],
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::List(items) => f.write_str(&items.join(",")),
            ArgValue::Count(n) => write!(f, "{n}"),
        }
    }
}

type CustomFn = dyn Fn(&mut TokenBuffer) -> Result<Option<ArgValue>, ParseError> + Send + Sync;

#[derive(Clone)]
pub enum Extractor {
    Required { label: String },
    Optional { fallback: Option<String> },
    Rest,
    Flag { name: String, short: Option<String> },
    Named { name: String, short: Option<String> },
    Unparsed,
    Custom(Arc<CustomFn>),
}

pub fn required(label: impl Into<String>) -> Extractor {
    Extractor::Required {
        label: label.into(),
    }
}

pub fn optional(fallback: impl Into<String>) -> Extractor {
    Extractor::Optional {
        fallback: Some(fallback.into()),
    }
}

/// `optional` without a fallback: yields nothing when the buffer is empty.
pub fn optional_none() -> Extractor {
    Extractor::Optional { fallback: None }
}

pub fn rest() -> Extractor {
    Extractor::Rest
}

pub fn flag(name: impl Into<String>, short: Option<&str>) -> Extractor {
    Extractor::Flag {
        name: name.into(),
        short: short.map(str::to_string),
    }
}

pub fn named(name: impl Into<String>, short: Option<&str>) -> Extractor {
    Extractor::Named {
        name: name.into(),
        short: short.map(str::to_string),
    }
}

pub fn unparsed() -> Extractor {
    Extractor::Unparsed
}

pub fn custom<F>(f: F) -> Extractor
where
    F: Fn(&mut TokenBuffer) -> Result<Option<ArgValue>, ParseError> + Send + Sync + 'static,
{
    Extractor::Custom(Arc::new(f))
}

fn spellings(name: &str, short: Option<&str>) -> Vec<String> {
    let mut out = vec![format!("--{name}")];
    if let Some(s) = short {
        out.push(format!("-{s}"));
    }
    out
}

impl Extractor {
    /// Run the extractor against the live buffer. `Ok(None)` is an
    /// undefined result (no value to record).
    pub fn extract(&self, buf: &mut TokenBuffer) -> Result<Option<ArgValue>, ParseError> {
        match self {
            Extractor::Required { label } => buf
                .pop_front()
                .map(|t| Some(ArgValue::Text(t)))
                .ok_or_else(|| ParseError::MissingRequiredArgument {
                    label: label.clone(),
                }),
            Extractor::Optional { fallback } => Ok(buf
                .pop_front()
                .or_else(|| fallback.clone())
                .map(ArgValue::Text)),
            Extractor::Rest => Ok(Some(ArgValue::List(buf.take_all()))),
            Extractor::Flag { name, short } => {
                let n = buf.take_flag(&spellings(name, short.as_deref()));
                Ok(Some(ArgValue::Count(n)))
            }
            Extractor::Named { name, short } => {
                let mut values = buf.take_named(&spellings(name, short.as_deref()));
                Ok(match values.len() {
                    0 => None,
                    1 => values.pop().map(ArgValue::Text),
                    _ => Some(ArgValue::List(values)),
                })
            }
            Extractor::Unparsed => Ok(buf.take_after_sentinel().map(ArgValue::List)),
            Extractor::Custom(f) => f(buf),
        }
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extractor::Required { label } => f.debug_struct("Required").field("label", label).finish(),
            Extractor::Optional { fallback } => f
                .debug_struct("Optional")
                .field("fallback", fallback)
                .finish(),
            Extractor::Rest => f.write_str("Rest"),
            Extractor::Flag { name, short } => f
                .debug_struct("Flag")
                .field("name", name)
                .field("short", short)
                .finish(),
            Extractor::Named { name, short } => f
                .debug_struct("Named")
                .field("name", name)
                .field("short", short)
                .finish(),
            Extractor::Unparsed => f.write_str("Unparsed"),
            Extractor::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// Custom extractors compare by identity.
impl PartialEq for Extractor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Extractor::Required { label: a }, Extractor::Required { label: b }) => a == b,
            (Extractor::Optional { fallback: a }, Extractor::Optional { fallback: b }) => a == b,
            (Extractor::Rest, Extractor::Rest) => true,
            (
                Extractor::Flag { name: a, short: sa },
                Extractor::Flag { name: b, short: sb },
            )
            | (
                Extractor::Named { name: a, short: sa },
                Extractor::Named { name: b, short: sb },
            ) => a == b && sa == sb,
            (Extractor::Unparsed, Extractor::Unparsed) => true,
            (Extractor::Custom(a), Extractor::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
