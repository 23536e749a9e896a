/*!
`send.rs`

Implements `cmdwalk send`: resolve tokens and dispatch the request over
HTTP through the `Router`.

Behavior:
  - Parse failures are reported without contacting the server.
  - Any HTTP status is printed; `--fail` turns non-2xx into an error exit.
  - Bodies that parse as JSON are pretty-printed in human mode.

JSON Output:
{
  "status": "ok",
  "subcommands": ["list"],
  "http_status": 200,
  "elapsed_ms": 12,
  "headers": { ... },
  "body": <JSON value or string>
}
*/

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use cmdwalk::{HttpTransport, Response, Router};

use crate::cmd::format::{Role, StyleOptions, color, status_role};
use crate::cmd::shared::{collect_tokens, load_command_tree, output_error};

#[derive(Args, Debug)]
pub struct SendArgs {
    #[arg(skip)]
    pub tree: Option<String>,

    /// Whole command as one shell-quoted string
    #[arg(long, value_name = "COMMAND")]
    pub line: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with an error on non-2xx responses
    #[arg(long)]
    pub fail: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Tokens to resolve against the tree
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "TOKENS")]
    pub tokens: Vec<String>,
}

pub fn execute_send(args: SendArgs) -> Result<()> {
    let tree = match load_command_tree(args.tree.as_deref()) {
        Ok(t) => t,
        Err(e) => return output_error(args.json, &format!("{e:#}")),
    };
    let tokens = match collect_tokens(args.line.as_deref(), &args.tokens) {
        Ok(t) => t,
        Err(e) => return output_error(args.json, &format!("{e:#}")),
    };

    let transport = HttpTransport::new().with_timeout(Duration::from_secs(args.timeout));
    let router = Router::new(tree, transport);

    // main is sync; the router needs a runtime for dispatch.
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let started = Instant::now();
    let (subcommands, outcome) = rt.block_on(async {
        let handle = router.request(tokens, None);
        let subcommands = handle.subcommands().to_vec();
        (subcommands, handle.outcome().await)
    });
    let elapsed_ms = started.elapsed().as_millis();

    let resp = match outcome {
        Ok(r) => r,
        Err(e) => return output_error(args.json, &e.to_string()),
    };

    if args.json {
        println!("{}", response_json(&resp, &subcommands, elapsed_ms));
    } else {
        print_human(&resp, &subcommands, elapsed_ms);
    }

    if args.fail && !resp.is_success() {
        anyhow::bail!("server responded with HTTP {}", resp.status);
    }
    Ok(())
}

fn response_json(resp: &Response, subcommands: &[String], elapsed_ms: u128) -> serde_json::Value {
    let headers: serde_json::Map<String, serde_json::Value> = resp
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::json!({
        "status": "ok",
        "subcommands": subcommands,
        "http_status": resp.status,
        "elapsed_ms": elapsed_ms,
        "headers": headers,
        "body": body_value(resp),
    })
}

fn body_value(resp: &Response) -> serde_json::Value {
    resp.json()
        .unwrap_or_else(|_| serde_json::Value::String(resp.text()))
}

fn print_human(resp: &Response, subcommands: &[String], elapsed_ms: u128) {
    let style = StyleOptions::detect();
    println!(
        "{} {}",
        color(
            status_role(resp.status),
            format!("HTTP {}", resp.status),
            &style
        ),
        color(
            Role::Dim,
            format!("({} • {elapsed_ms} ms)", subcommands.join(" ")),
            &style
        )
    );
    let body = match body_value(resp) {
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    };
    if !body.is_empty() {
        println!("{body}");
    }
}
