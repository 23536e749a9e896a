//! Tree files: declarative command trees in YAML or JSON.
//!
//! ```yaml
//! path: /procs
//! host: localhost
//! commands:
//!   show:
//!     path: [{ from: required, label: "Process ID/name" }]
//!   start:
//!     method: POST
//!     body:
//!       script: { from: required, label: Script name }
//!       args: { from: rest }
//! ```
//!
//! Subcommands live under `commands`, everything else on a node is
//! configuration. Extractors are maps tagged with `from`; any scalar
//! (string, number, bool) is a literal. Map order in the file is the
//! order fields are extracted in.

use std::path::Path;

use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};

use crate::error::ConfigError;
use crate::extract::Extractor;
use crate::serializer::Serializer;
use crate::tree::{ArgSpec, CommandNode, PathSpec, TransportParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFormat {
    Yaml,
    Json,
}

impl TreeFormat {
    /// `.yaml` / `.yml` are YAML, anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        let lower = path.to_string_lossy().to_ascii_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            TreeFormat::Yaml
        } else {
            TreeFormat::Json
        }
    }
}

/// Read and convert a tree file, picking the format from its extension.
pub fn load_tree(path: impl AsRef<Path>) -> Result<CommandNode, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    tree_from_str(&raw, TreeFormat::from_path(path))
}

pub fn tree_from_str(raw: &str, format: TreeFormat) -> Result<CommandNode, ConfigError> {
    let decl: NodeDecl = match format {
        TreeFormat::Yaml => serde_yaml::from_str(raw)?,
        TreeFormat::Json => serde_json::from_str(raw)?,
    };
    decl.into_node()
}

/* ---- File Shapes ---- */

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct NodeDecl {
    path: Option<PathDecl>,
    body: Fields,
    query: Fields,
    headers: Fields,
    host: Option<String>,
    hostname: Option<String>,
    port: Option<PortDecl>,
    local_address: Option<String>,
    socket_path: Option<String>,
    method: Option<String>,
    auth: Option<String>,
    agent: Option<bool>,
    serializer: Option<String>,
    commands: Ordered<NodeDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PathDecl {
    Single(ArgDecl),
    Parts(Vec<ArgDecl>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortDecl {
    Number(u16),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArgDecl {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Extract(ExtractorDecl),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
enum ExtractorDecl {
    Required {
        label: String,
    },
    Optional {
        #[serde(default)]
        fallback: Option<String>,
    },
    Rest,
    Flag {
        name: String,
        #[serde(default)]
        short: Option<String>,
    },
    Named {
        name: String,
        #[serde(default)]
        short: Option<String>,
    },
    Unparsed,
}

/// Ordered `name -> value` list. Serde maps lose file order once they
/// land in a `HashMap`/`BTreeMap`, and extraction order matters.
#[derive(Debug)]
struct Ordered<T>(Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Ordered(Vec::new())
    }
}

type Fields = Ordered<ArgDecl>;

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((k, v)) = map.next_entry::<String, T>()? {
                    if entries.iter().any(|(seen, _): &(String, T)| *seen == k) {
                        return Err(de::Error::custom(format!("duplicate key '{k}'")));
                    }
                    entries.push((k, v));
                }
                Ok(Ordered(entries))
            }

            // `body:` with nothing after it
            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Ordered(Vec::new()))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(std::marker::PhantomData))
    }
}

/* ---- Conversion ---- */

impl ArgDecl {
    fn into_spec(self) -> ArgSpec {
        match self {
            ArgDecl::Text(s) => ArgSpec::Literal(s),
            ArgDecl::Int(n) => ArgSpec::Literal(n.to_string()),
            ArgDecl::Float(n) => ArgSpec::Literal(n.to_string()),
            ArgDecl::Bool(b) => ArgSpec::Literal(b.to_string()),
            ArgDecl::Extract(e) => ArgSpec::Extract(e.into_extractor()),
        }
    }
}

impl ExtractorDecl {
    fn into_extractor(self) -> Extractor {
        match self {
            ExtractorDecl::Required { label } => Extractor::Required { label },
            ExtractorDecl::Optional { fallback } => Extractor::Optional { fallback },
            ExtractorDecl::Rest => Extractor::Rest,
            ExtractorDecl::Flag { name, short } => Extractor::Flag { name, short },
            ExtractorDecl::Named { name, short } => Extractor::Named { name, short },
            ExtractorDecl::Unparsed => Extractor::Unparsed,
        }
    }
}

fn fields(decl: Fields) -> Vec<(String, ArgSpec)> {
    decl.0
        .into_iter()
        .map(|(k, v)| (k, v.into_spec()))
        .collect()
}

impl NodeDecl {
    fn into_node(self) -> Result<CommandNode, ConfigError> {
        let port = match self.port {
            None => None,
            Some(PortDecl::Number(n)) => Some(n),
            Some(PortDecl::Text(s)) => Some(
                s.trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(s.clone()))?,
            ),
        };
        let serializer = self
            .serializer
            .map(|name| Serializer::by_name(&name).ok_or(ConfigError::UnknownSerializer(name)))
            .transpose()?;
        let path = self.path.map(|p| match p {
            PathDecl::Single(ArgDecl::Text(s)) => PathSpec::Literal(s),
            PathDecl::Single(other) => PathSpec::Parts(vec![other.into_spec()]),
            PathDecl::Parts(parts) => {
                PathSpec::Parts(parts.into_iter().map(ArgDecl::into_spec).collect())
            }
        });

        let mut children = std::collections::BTreeMap::new();
        for (name, child) in self.commands.0 {
            children.insert(name, child.into_node()?);
        }

        Ok(CommandNode {
            path,
            body: fields(self.body),
            query: fields(self.query),
            headers: fields(self.headers),
            transport: TransportParams {
                host: self.host,
                hostname: self.hostname,
                port,
                local_address: self.local_address,
                socket_path: self.socket_path,
                method: self.method,
                auth: self.auth,
                agent: self.agent,
            },
            serializer,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{optional, required, rest};
    use crate::walker::parse;

    const PROCS_YAML: &str = r#"
path: /procs
host: localhost
commands:
  list: {}
  show:
    path: [{ from: required, label: "Process ID/name" }]
  logs:
    path: [{ from: optional, fallback: _all }, logs]
  start:
    method: POST
    body:
      script: { from: required, label: Script name }
      args: { from: rest }
"#;

    fn expected_procs() -> CommandNode {
        CommandNode::new()
            .path("/procs")
            .host("localhost")
            .child("list", CommandNode::new())
            .child(
                "show",
                CommandNode::new().path_parts([required("Process ID/name")]),
            )
            .child(
                "logs",
                CommandNode::new().path_parts([ArgSpec::from(optional("_all")), "logs".into()]),
            )
            .child(
                "start",
                CommandNode::new()
                    .method("POST")
                    .body_field("script", required("Script name"))
                    .body_field("args", rest()),
            )
    }

    #[test]
    fn yaml_tree_matches_builder() {
        let tree = tree_from_str(PROCS_YAML, TreeFormat::Yaml).unwrap();
        assert_eq!(tree, expected_procs());
    }

    #[test]
    fn json_tree_matches_builder() {
        let raw = r#"{
            "path": "/procs",
            "host": "localhost",
            "commands": {
                "list": {},
                "show": { "path": [{ "from": "required", "label": "Process ID/name" }] },
                "logs": { "path": [{ "from": "optional", "fallback": "_all" }, "logs"] },
                "start": {
                    "method": "POST",
                    "body": {
                        "script": { "from": "required", "label": "Script name" },
                        "args": { "from": "rest" }
                    }
                }
            }
        }"#;
        let tree = tree_from_str(raw, TreeFormat::Json).unwrap();
        assert_eq!(tree, expected_procs());
    }

    #[test]
    fn body_order_follows_file() {
        let raw = "body:\n  zeta: { from: rest }\n  alpha: { from: required, label: a }\n";
        let tree = tree_from_str(raw, TreeFormat::Yaml).unwrap();
        let names: Vec<&str> = tree.body.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn scalars_literals_and_port_forms() {
        let raw = "port: \"8080\"\nquery:\n  limit: 10\n  pretty: true\n";
        let tree = tree_from_str(raw, TreeFormat::Yaml).unwrap();
        assert_eq!(tree.transport.port, Some(8080));
        let parsed = parse(Vec::<String>::new(), &tree).unwrap();
        assert_eq!(parsed.request.path(), "/?limit=10&pretty=true");
    }

    #[test]
    fn unknown_serializer_rejected() {
        let err = tree_from_str("serializer: xml\n", TreeFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSerializer(ref s) if s == "xml"));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(tree_from_str("_path: /x\n", TreeFormat::Yaml).is_err());
    }

    #[test]
    fn load_tree_from_file() {
        let path = std::env::temp_dir().join("cmdwalk_tree_test.yaml");
        std::fs::write(&path, PROCS_YAML).unwrap();
        let tree = load_tree(&path).unwrap();
        let parsed = parse(["start", "app.js", "--port", "3000"], &tree).unwrap();
        assert_eq!(parsed.request.method(), "POST");
        assert_eq!(
            serde_json::Value::Object(parsed.body),
            serde_json::json!({"script":"app.js","args":["--port","3000"]})
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_tree("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }
}
