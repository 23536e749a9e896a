//! Request descriptor: the walker's output, ready for a transport.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::serializer::Serializer;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 80;

/// Transport-agnostic description of one HTTP call.
///
/// Built by the walker and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) local_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) socket_path: Option<String>,
    pub(crate) method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) agent: Option<bool>,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn local_address(&self) -> Option<&str> {
        self.local_address.as_deref()
    }

    pub fn socket_path(&self) -> Option<&str> {
        self.socket_path.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    pub fn agent(&self) -> Option<bool> {
        self.agent
    }

    /// Path including any query string, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Host to connect to: `hostname` wins over `host`, then `localhost`.
    pub fn effective_host(&self) -> &str {
        self.hostname
            .as_deref()
            .or(self.host.as_deref())
            .unwrap_or(DEFAULT_HOST)
    }

    /// `http://host:port/path` rendering for URL-based transports.
    pub fn url(&self) -> String {
        let host = self.effective_host();
        // Bare IPv6 literals need brackets inside a URL authority.
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        format!(
            "http://{host}:{}{}",
            self.port.unwrap_or(DEFAULT_PORT),
            self.path
        )
    }
}

/// Full result of walking a command tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub request: RequestDescriptor,
    pub body: Map<String, Value>,
    pub serializer: Serializer,
    pub subcommands: Vec<String>,
}

impl ParsedCommand {
    /// Serialized body, or `None` when there is nothing to send.
    pub fn serialized_body(&self) -> Option<Vec<u8>> {
        if self.body.is_empty() {
            None
        } else {
            Some(self.serializer.serialize(&self.body))
        }
    }
}

/// Join path components with `/` and make sure the result is rooted.
pub fn join_path(components: &[String]) -> String {
    let joined = components.join("/");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Append `?k=v&...` to `path` when `query` is non-empty.
pub fn with_query(path: String, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path;
    }
    let mut qs = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in query {
        qs.append_pair(k, v);
    }
    format!("{path}?{}", qs.finish())
}
