/*!
`list.rs`

Implements `cmdwalk list`: enumerate every subcommand path in the tree,
with the method and path template each one resolves to.

JSON Output Shape:
{
  "status": "ok",
  "count": 3,
  "commands": [
    { "command": "start", "method": "POST", "path": "/jobs", "leaf": true }
  ]
}

Path templates render extractors as `<label>` / `[fallback]` / `...`
placeholders instead of running them.
*/

use anyhow::Result;
use clap::Args;
use cmdwalk::{ArgSpec, CommandNode, Extractor, PathSpec};

use crate::cmd::format::{Role, StyleOptions, box_header, color};
use crate::cmd::shared::{load_command_tree, output_error};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(skip)]
    pub tree: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Show only commands under this prefix (space separated)
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,
}

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: String,
    pub method: String,
    pub path: String,
    pub leaf: bool,
}

pub fn execute_list(args: ListArgs) -> Result<()> {
    let tree = match load_command_tree(args.tree.as_deref()) {
        Ok(t) => t,
        Err(e) => return output_error(args.json, &format!("{e:#}")),
    };

    let mut entries = describe_tree(&tree);
    if let Some(prefix) = args.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        entries.retain(|e| e.command == prefix || e.command.starts_with(&format!("{prefix} ")));
    }

    if args.json {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "command": e.command,
                    "method": e.method,
                    "path": e.path,
                    "leaf": e.leaf,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "count": items.len(),
                "commands": items,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(format!("Commands ({})", entries.len()), None::<&str>, &style)
    );
    if entries.is_empty() {
        println!("{}", color(Role::Dim, "(none)", &style));
        return Ok(());
    }
    let width = entries.iter().map(|e| e.command.len()).max().unwrap_or(0);
    for e in &entries {
        let name = if e.leaf {
            color(Role::Primary, format!("{:<width$}", e.command), &style)
        } else {
            color(Role::Dim, format!("{:<width$}", e.command), &style)
        };
        println!("{name}  {:<6} {}", e.method, e.path);
    }
    Ok(())
}

/// Walk the whole tree, accumulating method and path templates the way
/// a real parse would along each branch.
pub fn describe_tree(tree: &CommandNode) -> Vec<CommandEntry> {
    let mut out = Vec::new();
    let base = Accum {
        names: Vec::new(),
        method: tree.transport.method.clone(),
        path: template_parts(tree),
    };
    visit(tree, &base, &mut out);
    out
}

struct Accum {
    names: Vec<String>,
    method: Option<String>,
    path: Vec<String>,
}

fn visit(node: &CommandNode, acc: &Accum, out: &mut Vec<CommandEntry>) {
    for (name, child) in &node.children {
        let mut names = acc.names.clone();
        names.push(name.clone());
        let mut path = acc.path.clone();
        path.extend(template_parts(child));
        let next = Accum {
            names,
            method: child.transport.method.clone().or_else(|| acc.method.clone()),
            path,
        };
        out.push(CommandEntry {
            command: next.names.join(" "),
            method: next
                .method
                .as_deref()
                .unwrap_or(cmdwalk::descriptor::DEFAULT_METHOD)
                .to_ascii_uppercase(),
            path: cmdwalk::descriptor::join_path(&next.path),
            leaf: child.is_leaf(),
        });
        visit(child, &next, out);
    }
}

fn template_parts(node: &CommandNode) -> Vec<String> {
    match &node.path {
        None => Vec::new(),
        Some(PathSpec::Literal(p)) => vec![p.clone()],
        Some(PathSpec::Parts(parts)) => parts.iter().map(placeholder).collect(),
    }
}

fn placeholder(spec: &ArgSpec) -> String {
    match spec {
        ArgSpec::Literal(s) => s.clone(),
        ArgSpec::Extract(Extractor::Required { label }) => format!("<{label}>"),
        ArgSpec::Extract(Extractor::Optional { fallback }) => {
            format!("[{}]", fallback.as_deref().unwrap_or(""))
        }
        ArgSpec::Extract(Extractor::Named { name, .. }) => format!("<--{name}>"),
        ArgSpec::Extract(Extractor::Flag { name, .. }) => format!("<#--{name}>"),
        ArgSpec::Extract(_) => "...".to_string(),
    }
}
