/*!
`parse.rs`

Implements `cmdwalk parse`: resolve tokens against the tree and print the
request that would be sent, without sending it.

JSON Output:
{
  "status": "ok",
  "subcommands": ["start"],
  "request": { "method": "POST", "path": "/jobs", "headers": {...}, ... },
  "body": { "script": "app.js", "args": [] },
  "contentType": "application/json"
}
*/

use anyhow::Result;
use clap::Args;
use cmdwalk::{ParsedCommand, parse};

use crate::cmd::format::{Role, StyleOptions, box_header, color, kv_lines};
use crate::cmd::shared::{collect_tokens, load_command_tree, output_error, parsed_to_json};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Filled from the global --tree flag.
    #[arg(skip)]
    pub tree: Option<String>,

    /// Whole command as one shell-quoted string
    #[arg(long, value_name = "COMMAND")]
    pub line: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Tokens to resolve against the tree
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "TOKENS")]
    pub tokens: Vec<String>,
}

pub fn execute_parse(args: ParseArgs) -> Result<()> {
    let tree = match load_command_tree(args.tree.as_deref()) {
        Ok(t) => t,
        Err(e) => return output_error(args.json, &format!("{e:#}")),
    };
    let tokens = match collect_tokens(args.line.as_deref(), &args.tokens) {
        Ok(t) => t,
        Err(e) => return output_error(args.json, &format!("{e:#}")),
    };

    let parsed = match parse(tokens, &tree) {
        Ok(p) => p,
        Err(e) => return output_error(args.json, &e.to_string()),
    };

    if args.json {
        let mut out = parsed_to_json(&parsed);
        if let serde_json::Value::Object(ref mut map) = out {
            map.insert("status".into(), "ok".into());
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string())
        );
    } else {
        println!("{}", render_human(&parsed, &StyleOptions::detect()));
    }
    Ok(())
}

pub fn render_human(parsed: &ParsedCommand, style: &StyleOptions) -> String {
    let req = &parsed.request;
    let title = format!("{} {}", req.method(), req.path());
    let subtitle = if parsed.subcommands.is_empty() {
        "(root)".to_string()
    } else {
        parsed.subcommands.join(" ")
    };

    let mut rows: Vec<(&str, String)> = vec![("url", req.url())];
    if let Some(sock) = req.socket_path() {
        rows.push(("socket", sock.to_string()));
    }
    if let Some(addr) = req.local_address() {
        rows.push(("local", addr.to_string()));
    }
    for (k, v) in req.headers() {
        rows.push(("header", format!("{k}: {v}")));
    }

    let mut out = box_header(title, Some(subtitle), style);
    out.push('\n');
    out.push_str(&kv_lines(&rows, style));
    if parsed.body.is_empty() {
        out.push('\n');
        out.push_str(&color(Role::Dim, "(no body)", style));
    } else {
        let body = serde_json::Value::Object(parsed.body.clone());
        out.push_str(&format!(
            "\n{}\n{}",
            color(Role::Accent, "body:", style),
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
        ));
    }
    out
}
