//! Transport seam: what the router hands a resolved request to.
//!
//! `Transport` is the only place network I/O happens. The walker never
//! touches it; the router calls `dispatch` once per successful parse.
//! `HttpTransport` is the default implementation on top of `reqwest`.

use std::net::IpAddr;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::descriptor::RequestDescriptor;
use crate::error::TransportError;

/// A resolved request with its body already serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub descriptor: RequestDescriptor,
    /// `None` when the parsed body was empty.
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text (lossy UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Performs the HTTP exchange for a resolved request.
///
/// The returned future is `'static` so the router can spawn it.
pub trait Transport: Send + Sync {
    fn dispatch(&self, request: OutgoingRequest) -> BoxFuture<'static, Result<Response, TransportError>>;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed transport.
///
/// A client is built per request because `local_address` and the
/// pooling opt-out are client-level settings in `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build(&self, req: &OutgoingRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let d = &req.descriptor;
        let url_str = d.url();
        let build_err = |reason: String| TransportError::Build {
            url: url_str.clone(),
            reason,
        };

        if let Some(socket) = d.socket_path() {
            return Err(TransportError::UnsupportedSocketPath(socket.to_string()));
        }

        let url = url::Url::parse(&url_str).map_err(|e| build_err(e.to_string()))?;
        let method = reqwest::Method::from_bytes(d.method().as_bytes())
            .map_err(|e| build_err(format!("invalid method '{}': {e}", d.method())))?;

        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if let Some(addr) = d.local_address() {
            let ip: IpAddr = addr
                .parse()
                .map_err(|e| build_err(format!("invalid local address '{addr}': {e}")))?;
            builder = builder.local_address(ip);
        }
        if d.agent() == Some(false) {
            builder = builder.pool_max_idle_per_host(0);
        }
        let client = builder.build().map_err(|e| build_err(e.to_string()))?;

        let mut headers = HeaderMap::new();
        for (k, v) in d.headers() {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| build_err(format!("invalid header name '{k}': {e}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| build_err(format!("invalid header value for '{k}': {e}")))?;
            headers.insert(name, value);
        }

        let mut request = client.request(method, url).headers(headers);
        if let Some(auth) = d.auth() {
            let (user, pass) = match auth.split_once(':') {
                Some((u, p)) => (u, Some(p)),
                None => (auth, None),
            };
            request = request.basic_auth(user, pass);
        }
        if let Some(body) = &req.body {
            request = request.body(body.clone());
        }
        Ok(request)
    }
}

impl Transport for HttpTransport {
    fn dispatch(&self, request: OutgoingRequest) -> BoxFuture<'static, Result<Response, TransportError>> {
        let url = request.descriptor.url();
        let built = self.build(&request);
        Box::pin(async move {
            let builder = built?;
            debug!(%url, "sending request");
            let resp = builder
                .send()
                .await
                .map_err(|source| TransportError::Send {
                    url: url.clone(),
                    source,
                })?;
            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = resp
                .bytes()
                .await
                .map_err(|source| TransportError::ReadBody {
                    url: url.clone(),
                    source,
                })?
                .to_vec();
            debug!(%url, status, bytes = body.len(), "response received");
            Ok(Response {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::CommandNode;
    use crate::walker::parse;

    fn outgoing(tree: &CommandNode, tokens: &[&str]) -> OutgoingRequest {
        let parsed = parse(tokens.iter().copied(), tree).unwrap();
        OutgoingRequest {
            body: parsed.serialized_body(),
            descriptor: parsed.request,
        }
    }

    #[test]
    fn socket_path_is_rejected() {
        let tree = CommandNode::new().socket_path("/var/run/app.sock");
        let err = HttpTransport::new().build(&outgoing(&tree, &[])).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedSocketPath(_)));
    }

    #[test]
    fn bad_local_address_is_a_build_error() {
        let tree = CommandNode::new().local_address("not-an-ip");
        let err = HttpTransport::new().build(&outgoing(&tree, &[])).unwrap_err();
        assert!(err.to_string().contains("invalid local address"));
    }

    #[test]
    fn request_carries_method_headers_and_body() {
        let tree = CommandNode::new()
            .host("127.0.0.1")
            .port(9)
            .method("PUT")
            .auth("user:secret")
            .body_field("name", "demo");
        let built = HttpTransport::new()
            .build(&outgoing(&tree, &[]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(built.method().as_str(), "PUT");
        assert_eq!(built.url().as_str(), "http://127.0.0.1:9/");
        assert_eq!(
            built.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert!(built.headers().get("authorization").is_some());
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()),
            Some(br#"{"name":"demo"}"#.as_slice())
        );
    }

    #[test]
    fn response_helpers() {
        let resp = Response {
            status: 201,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: br#"{"ok":true}"#.to_vec(),
        };
        assert!(resp.is_success());
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.json().unwrap(), serde_json::json!({"ok": true}));
    }
}
