//! Command tree walker.
//!
//! Single pass, no backtracking. At every node on the way down the
//! node's own declarations run first (serializer, path, body, query,
//! headers, transport scalars) and may consume tokens; only then is the
//! next token read as a subcommand name. That ordering lets a node
//! claim its own arguments (`show <id>`) before anything is interpreted
//! as a deeper subcommand.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::descriptor::{DEFAULT_METHOD, ParsedCommand, RequestDescriptor, join_path, with_query};
use crate::error::ParseError;
use crate::serializer::Serializer;
use crate::tokens::TokenBuffer;
use crate::tree::{ArgSpec, CommandNode, PathSpec, TransportParams};

const CONTENT_TYPE: &str = "content-type";

/// Walk `tree` with `tokens` and build the request descriptor.
pub fn parse<I, S>(tokens: I, tree: &CommandNode) -> Result<ParsedCommand, ParseError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Walk::new(TokenBuffer::new(tokens)).run(tree)
}

/// `parse` over the process arguments, minus the program name.
pub fn parse_env(tree: &CommandNode) -> Result<ParsedCommand, ParseError> {
    parse(env_tokens(), tree)
}

/// Process arguments after the program name. Non-UTF-8 arguments are
/// converted lossily instead of aborting.
pub(crate) fn env_tokens() -> Vec<String> {
    std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

/// Per-call accumulators. Created fresh for each parse and consumed by
/// `finish`.
struct Walk {
    tokens: TokenBuffer,
    params: TransportParams,
    headers: Vec<(String, String)>,
    path: Vec<String>,
    body: Map<String, Value>,
    query: Vec<(String, String)>,
    serializer: Serializer,
    subcommands: Vec<String>,
}

impl Walk {
    fn new(tokens: TokenBuffer) -> Self {
        Self {
            tokens,
            params: TransportParams::default(),
            headers: vec![(
                CONTENT_TYPE.to_string(),
                Serializer::Json.content_type().to_string(),
            )],
            path: Vec::new(),
            body: Map::new(),
            query: Vec::new(),
            serializer: Serializer::Json,
            subcommands: Vec::new(),
        }
    }

    fn run(mut self, root: &CommandNode) -> Result<ParsedCommand, ParseError> {
        let mut current = root;
        loop {
            self.apply(current)?;

            let Some(name) = self.tokens.pop_front() else {
                break;
            };
            current = current
                .get(&name)
                .ok_or_else(|| ParseError::UnknownSubcommand(name.clone()))?;
            debug!(subcommand = %name, "descending");
            self.subcommands.push(name);
        }
        Ok(self.finish())
    }

    fn apply(&mut self, node: &CommandNode) -> Result<(), ParseError> {
        if let Some(serializer) = &node.serializer {
            self.serializer = serializer.clone();
            self.set_header(CONTENT_TYPE, serializer.content_type().to_string());
        }

        match &node.path {
            Some(PathSpec::Literal(p)) => self.path.push(p.clone()),
            Some(PathSpec::Parts(parts)) => {
                for part in parts {
                    if let Some(segment) = self.resolve_text(part)? {
                        self.path.push(segment);
                    }
                }
            }
            None => {}
        }

        for (name, spec) in &node.body {
            let value = match spec {
                ArgSpec::Literal(s) => Some(Value::String(s.clone())),
                ArgSpec::Extract(e) => e.extract(&mut self.tokens)?.map(|v| v.to_json()),
            };
            if let Some(value) = value {
                self.body.insert(name.clone(), value);
            }
        }

        for (name, spec) in &node.query {
            let values = match spec {
                ArgSpec::Literal(s) => vec![s.clone()],
                ArgSpec::Extract(e) => match e.extract(&mut self.tokens)? {
                    Some(v) => v.to_strings(),
                    None => continue,
                },
            };
            // A field declared again further down replaces the earlier one.
            self.query.retain(|(k, _)| k != name);
            self.query
                .extend(values.into_iter().map(|v| (name.clone(), v)));
        }

        for (name, spec) in &node.headers {
            if let Some(value) = self.resolve_text(spec)? {
                self.set_header(name, value);
            }
        }

        self.merge_params(&node.transport);
        Ok(())
    }

    fn resolve_text(&mut self, spec: &ArgSpec) -> Result<Option<String>, ParseError> {
        Ok(match spec {
            ArgSpec::Literal(s) => Some(s.clone()),
            ArgSpec::Extract(e) => e.extract(&mut self.tokens)?.map(|v| v.to_string()),
        })
    }

    fn set_header(&mut self, name: &str, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_ascii_lowercase(), value)),
        }
    }

    fn merge_params(&mut self, node: &TransportParams) {
        fn overwrite<T: Clone + std::fmt::Debug>(key: &str, slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                trace!(key, value = ?v, "set transport parameter");
                *slot = Some(v.clone());
            }
        }

        let p = &mut self.params;
        overwrite("host", &mut p.host, &node.host);
        overwrite("hostname", &mut p.hostname, &node.hostname);
        overwrite("port", &mut p.port, &node.port);
        overwrite("localAddress", &mut p.local_address, &node.local_address);
        overwrite("socketPath", &mut p.socket_path, &node.socket_path);
        overwrite("method", &mut p.method, &node.method);
        overwrite("auth", &mut p.auth, &node.auth);
        overwrite("agent", &mut p.agent, &node.agent);
    }

    fn finish(self) -> ParsedCommand {
        let path = with_query(join_path(&self.path), &self.query);
        let p = self.params;
        ParsedCommand {
            request: RequestDescriptor {
                host: p.host,
                hostname: p.hostname,
                port: p.port,
                local_address: p.local_address,
                socket_path: p.socket_path,
                method: p
                    .method
                    .map(|m| m.to_ascii_uppercase())
                    .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
                auth: p.auth,
                agent: p.agent,
                path,
                headers: self.headers,
            },
            body: self.body,
            serializer: self.serializer,
            subcommands: self.subcommands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{custom, flag, named, optional, required, rest, unparsed};
    use serde_json::json;

    fn jobs() -> CommandNode {
        CommandNode::new()
            .path("/jobs")
            .child("list", CommandNode::new())
            .child(
                "start",
                CommandNode::new()
                    .method("POST")
                    .body_field("script", required("Script name"))
                    .body_field("args", rest()),
            )
    }

    fn procs() -> CommandNode {
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
    }

    #[test]
    fn list_resolves_to_root_path() {
        let parsed = parse(["list"], &jobs()).unwrap();
        assert_eq!(parsed.request.path(), "/jobs");
        assert_eq!(parsed.request.method(), "GET");
        assert!(parsed.body.is_empty());
        assert_eq!(parsed.subcommands, vec!["list"]);
        assert!(parsed.serializer.is_json());
        assert_eq!(
            parsed.request.header("content-type"),
            Some("application/json")
        );
    }

    #[test]
    fn start_collects_body() {
        let parsed = parse(["start", "my-script.js"], &jobs()).unwrap();
        assert_eq!(parsed.request.method(), "POST");
        assert_eq!(
            Value::Object(parsed.body),
            json!({"script":"my-script.js","args":[]})
        );
        assert_eq!(parsed.subcommands, vec!["start"]);
    }

    #[test]
    fn rest_runs_after_required_and_keeps_flags() {
        let parsed = parse(["start", "my-script", "--flag"], &jobs()).unwrap();
        assert_eq!(
            Value::Object(parsed.body),
            json!({"script":"my-script","args":["--flag"]})
        );
    }

    #[test]
    fn unknown_subcommand_is_reported() {
        let err = parse(["bogus"], &jobs()).unwrap_err();
        assert_eq!(err, ParseError::UnknownSubcommand("bogus".into()));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn missing_required_argument_is_reported() {
        let err = parse(["start"], &jobs()).unwrap_err();
        assert!(matches!(err, ParseError::MissingRequiredArgument { ref label } if label == "Script name"));
    }

    #[test]
    fn path_extractors_run_before_next_subcommand() {
        let tree = procs();
        let show = parse(["show", "42"], &tree).unwrap();
        assert_eq!(show.request.path(), "/procs/42");
        assert_eq!(show.request.host(), Some("localhost"));

        let logs = parse(["logs"], &tree).unwrap();
        assert_eq!(logs.request.path(), "/procs/_all/logs");
        let logs = parse(["logs", "web"], &tree).unwrap();
        assert_eq!(logs.request.path(), "/procs/web/logs");
    }

    #[test]
    fn root_declarations_apply_without_tokens() {
        let parsed = parse(Vec::<String>::new(), &procs()).unwrap();
        assert_eq!(parsed.request.path(), "/procs");
        assert!(parsed.subcommands.is_empty());
    }

    #[test]
    fn deeper_scalars_overwrite_ancestors() {
        let tree = CommandNode::new()
            .host("a.example")
            .port(8080)
            .child(
                "admin",
                CommandNode::new().host("b.example").method("delete").auth("u:p"),
            );
        let parsed = parse(["admin"], &tree).unwrap();
        assert_eq!(parsed.request.host(), Some("b.example"));
        assert_eq!(parsed.request.port(), Some(8080));
        assert_eq!(parsed.request.method(), "DELETE");
        assert_eq!(parsed.request.auth(), Some("u:p"));
    }

    #[test]
    fn query_fields_are_appended() {
        let tree = CommandNode::new().path("search").child(
            "find",
            CommandNode::new()
                .query_field("limit", named("limit", Some("n")))
                .query_field("q", rest())
                .query_field("fmt", "json"),
        );
        let parsed = parse(["find", "-n", "5", "a b", "c"], &tree).unwrap();
        assert_eq!(
            parsed.request.path(),
            "/search?limit=5&q=a+b&q=c&fmt=json"
        );
    }

    #[test]
    fn flags_and_named_consume_before_rest() {
        let tree = CommandNode::new().child(
            "run",
            CommandNode::new()
                .method("POST")
                .body_field("force", flag("force", Some("f")))
                .body_field("env", named("env", None))
                .body_field("passthrough", unparsed())
                .body_field("args", rest()),
        );
        let parsed = parse(
            ["run", "a", "-f", "--env", "prod", "b", "--", "x", "-y"],
            &tree,
        )
        .unwrap();
        assert_eq!(
            Value::Object(parsed.body),
            json!({"force":1,"env":"prod","passthrough":["x","-y"],"args":["a","b"]})
        );
    }

    #[test]
    fn undefined_values_are_omitted() {
        let tree = CommandNode::new()
            .body_field("env", named("env", None))
            .query_field("tag", named("tag", None))
            .path_parts([ArgSpec::from("v1"), unparsed().into()]);
        let parsed = parse(Vec::<String>::new(), &tree).unwrap();
        assert!(parsed.body.is_empty());
        assert_eq!(parsed.request.path(), "/v1");
    }

    #[test]
    fn unmatched_extractor_keeps_ancestor_values() {
        let tree = CommandNode::new()
            .body_field("env", "staging")
            .query_field("env", "staging")
            .header("X-Env", "staging")
            .child(
                "deploy",
                CommandNode::new()
                    .body_field("env", named("env", None))
                    .query_field("env", named("env", None))
                    .header("X-Env", named("env", None)),
            );
        let parsed = parse(["deploy"], &tree).unwrap();
        assert_eq!(Value::Object(parsed.body.clone()), json!({"env":"staging"}));
        assert_eq!(parsed.request.path(), "/?env=staging");
        assert_eq!(parsed.request.header("x-env"), Some("staging"));

        // The first declaration claims the pair; later ones find nothing.
        let parsed = parse(["deploy", "--env", "prod"], &tree).unwrap();
        assert_eq!(Value::Object(parsed.body.clone()), json!({"env":"prod"}));
        assert_eq!(parsed.request.path(), "/?env=staging");
    }

    #[test]
    fn leftover_token_after_leaf_arguments_is_unknown() {
        let err = parse(["show", "42", "extra"], &procs()).unwrap_err();
        assert_eq!(err, ParseError::UnknownSubcommand("extra".into()));
    }

    #[test]
    fn env_tokens_skip_program_name() {
        let all: Vec<String> = std::env::args().collect();
        assert_eq!(env_tokens(), all[1..].to_vec());
    }

    #[test]
    fn serializer_override_updates_content_type() {
        let tree = CommandNode::new().child(
            "submit",
            CommandNode::new()
                .serializer(Serializer::Form)
                .body_field("name", required("name")),
        );
        let parsed = parse(["submit", "x y"], &tree).unwrap();
        assert_eq!(parsed.serializer, Serializer::Form);
        assert_eq!(
            parsed.request.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(parsed.serialized_body(), Some(b"name=x+y".to_vec()));
    }

    #[test]
    fn headers_merge_root_to_leaf() {
        let tree = CommandNode::new()
            .header("X-Client", "cmdwalk")
            .header("Accept", "text/plain")
            .child(
                "get",
                CommandNode::new()
                    .header("accept", "application/json")
                    .header("X-Request-Id", required("request id")),
            );
        let parsed = parse(["get", "abc"], &tree).unwrap();
        let req = &parsed.request;
        assert_eq!(req.header("x-client"), Some("cmdwalk"));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("x-request-id"), Some("abc"));
    }

    #[test]
    fn custom_extractor_errors_propagate() {
        let tree = CommandNode::new().child(
            "num",
            CommandNode::new().body_field(
                "n",
                custom(|b| match b.pop_front() {
                    Some(t) if t.parse::<i64>().is_ok() => {
                        Ok(Some(crate::extract::ArgValue::Text(t)))
                    }
                    _ => Err(ParseError::Custom("expected a number".into())),
                }),
            ),
        );
        assert!(parse(["num", "7"], &tree).is_ok());
        assert_eq!(
            parse(["num", "x"], &tree).unwrap_err(),
            ParseError::Custom("expected a number".into())
        );
    }

    #[test]
    fn parse_is_deterministic() {
        let tree = jobs();
        let a = parse(["start", "s.js", "1"], &tree).unwrap();
        let b = parse(["start", "s.js", "1"], &tree).unwrap();
        assert_eq!(a, b);
    }
}
