use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod utils;

use cmd::{ListArgs, ParseArgs, SendArgs};

/// cmdwalk - run a declarative command tree as an HTTP client
///
/// Command layout:
///   cmdwalk [-f TREE] parse [--json] [--line "<cmd>"] <TOKENS>...
///   cmdwalk [-f TREE] list  [--json] [--prefix "<cmd>"]
///   cmdwalk [-f TREE] send  [--json] [--fail] [--timeout SECS] <TOKENS>...
///
/// Global flags / env:
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   -f / --tree     Command tree file, YAML or JSON (or CMDWALK_TREE env)
///
/// Examples:
///   cmdwalk -f procs.yaml list
///   cmdwalk -f procs.yaml parse start app.js --port 3000
///   cmdwalk -f procs.yaml send --json logs web
///   cmdwalk -f procs.yaml parse --line 'start "my app.js"'
#[derive(Parser, Debug)]
#[command(
    name = "cmdwalk",
    version,
    author,
    about = "cmdwalk - map nested CLI subcommands onto HTTP requests",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Command tree file (YAML or JSON)
    #[arg(short = 'f', long = "tree", global = true, value_name = "PATH")]
    tree: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve tokens and print the request without sending it
    Parse(ParseArgs),

    /// List every subcommand in the tree
    List(ListArgs),

    /// Resolve tokens and send the request
    Send(SendArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    // CMDWALK_TREE is consulted later, when the tree is loaded.
    let tree = cli.tree.clone();

    match cli.command {
        Commands::Parse(mut args) => {
            args.tree = tree;
            cmd::execute_parse(args)
        }
        Commands::List(mut args) => {
            args.tree = tree;
            cmd::execute_list(args)
        }
        Commands::Send(mut args) => {
            args.tree = tree;
            cmd::execute_send(args)
        }
    }
}
