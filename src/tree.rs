//! Command tree model.
//!
//! A `CommandNode` carries its own request contributions (path, body,
//! query, headers, transport scalars, serializer) in explicit fields and
//! its subcommands in a separate `children` map, so a subcommand can be
//! named anything without clashing with configuration.
//!
//! Trees are usually built once at startup, either through the builder
//! methods below or from a tree file (see `config`).

use std::collections::BTreeMap;

use crate::extract::Extractor;
use crate::serializer::Serializer;

/// A literal value or an extractor, accepted wherever the tree expects
/// a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSpec {
    Literal(String),
    Extract(Extractor),
}

impl From<&str> for ArgSpec {
    fn from(s: &str) -> Self {
        ArgSpec::Literal(s.to_string())
    }
}

impl From<String> for ArgSpec {
    fn from(s: String) -> Self {
        ArgSpec::Literal(s)
    }
}

impl From<Extractor> for ArgSpec {
    fn from(e: Extractor) -> Self {
        ArgSpec::Extract(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSpec {
    Literal(String),
    Parts(Vec<ArgSpec>),
}

/// Connection-level settings a node may declare. Set fields overwrite
/// whatever an ancestor declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportParams {
    pub host: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub local_address: Option<String>,
    pub socket_path: Option<String>,
    pub method: Option<String>,
    /// `user:password` for basic auth.
    pub auth: Option<String>,
    /// `Some(false)` opts out of connection pooling.
    pub agent: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandNode {
    pub path: Option<PathSpec>,
    pub body: Vec<(String, ArgSpec)>,
    pub query: Vec<(String, ArgSpec)>,
    pub headers: Vec<(String, ArgSpec)>,
    pub transport: TransportParams,
    pub serializer: Option<Serializer>,
    pub children: BTreeMap<String, CommandNode>,
}

impl CommandNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(PathSpec::Literal(path.into()));
        self
    }

    pub fn path_parts<I, A>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgSpec>,
    {
        self.path = Some(PathSpec::Parts(parts.into_iter().map(Into::into).collect()));
        self
    }

    pub fn body_field(mut self, name: impl Into<String>, spec: impl Into<ArgSpec>) -> Self {
        self.body.push((name.into(), spec.into()));
        self
    }

    pub fn query_field(mut self, name: impl Into<String>, spec: impl Into<ArgSpec>) -> Self {
        self.query.push((name.into(), spec.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, spec: impl Into<ArgSpec>) -> Self {
        self.headers.push((name.into(), spec.into()));
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.transport.method = Some(method.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.transport.host = Some(host.into());
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.transport.hostname = Some(hostname.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.transport.port = Some(port);
        self
    }

    pub fn local_address(mut self, addr: impl Into<String>) -> Self {
        self.transport.local_address = Some(addr.into());
        self
    }

    pub fn socket_path(mut self, path: impl Into<String>) -> Self {
        self.transport.socket_path = Some(path.into());
        self
    }

    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.transport.auth = Some(auth.into());
        self
    }

    pub fn agent(mut self, pooled: bool) -> Self {
        self.transport.agent = Some(pooled);
        self
    }

    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn child(mut self, name: impl Into<String>, node: CommandNode) -> Self {
        self.children.insert(name.into(), node);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandNode> {
        self.children.get(name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
