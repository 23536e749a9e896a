/*!
shared.rs - helpers used by every subcommand.

  - resolve_tree_path: --tree flag, else CMDWALK_TREE
  - load_command_tree: tree file -> CommandNode (with context)
  - collect_tokens:    --line (shell-split) + trailing tokens
  - parsed_to_json:    ParsedCommand -> JSON summary
  - output_error:      JSON / human error reporting
*/

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cmdwalk::{CommandNode, ParsedCommand, load_tree};
use serde_json::json;

use crate::cmd::format::{StyleOptions, box_header};

pub const TREE_ENV: &str = "CMDWALK_TREE";

/// Tree file location: explicit flag first, then `CMDWALK_TREE`.
pub fn resolve_tree_path(flag: Option<&str>) -> Result<PathBuf> {
    if let Some(p) = flag.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    match std::env::var(TREE_ENV) {
        Ok(p) if !p.trim().is_empty() => Ok(PathBuf::from(p.trim())),
        _ => bail!("no command tree specified (use --tree or {TREE_ENV})"),
    }
}

pub fn load_command_tree(flag: Option<&str>) -> Result<CommandNode> {
    let path = resolve_tree_path(flag)?;
    let tree = load_tree(&path)
        .with_context(|| format!("Failed to load command tree: '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), commands = tree.children.len(), "tree loaded");
    Ok(tree)
}

/// Tokens from `--line` (split with shell quoting rules) followed by
/// any trailing tokens, in that order.
pub fn collect_tokens(line: Option<&str>, trailing: &[String]) -> Result<Vec<String>> {
    let mut tokens = match line {
        Some(l) => shell_words::split(l)
            .with_context(|| format!("Failed to split command line: '{l}'"))?,
        None => Vec::new(),
    };
    tokens.extend(trailing.iter().cloned());
    Ok(tokens)
}

/// JSON summary of a parse: descriptor, body and subcommands.
pub fn parsed_to_json(parsed: &ParsedCommand) -> serde_json::Value {
    let req = &parsed.request;
    let headers: serde_json::Map<String, serde_json::Value> = req
        .headers()
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    json!({
        "subcommands": parsed.subcommands,
        "request": {
            "host": req.host(),
            "hostname": req.hostname(),
            "port": req.port(),
            "localAddress": req.local_address(),
            "socketPath": req.socket_path(),
            "method": req.method(),
            "auth": req.auth().map(|_| "<redacted>"),
            "agent": req.agent(),
            "path": req.path(),
            "headers": headers,
        },
        "body": parsed.body,
        "contentType": parsed.serializer.content_type(),
    })
}

/// Report `msg` in the requested format and turn it into an error so
/// the process exits non-zero.
pub fn output_error(json: bool, msg: &str) -> Result<()> {
    if json {
        let err = json!({"status":"error","error":msg});
        println!(
            "{}",
            serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
        );
    } else {
        let style = StyleOptions::detect();
        let boxed = box_header("Error", Some(msg), &style);
        eprintln!("{boxed}");
    }
    bail!(msg.to_string())
}
