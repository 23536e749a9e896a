/*!
Command dispatcher module for the `cmdwalk` binary.

  src/cmd/
    mod.rs     (this file: declarations + re-exports)
    parse.rs   (ParseArgs + execute_parse)
    list.rs    (ListArgs  + execute_list)
    send.rs    (SendArgs  + execute_send)
    shared.rs  (tree loading, token collection, error output)
    format.rs  (human output helpers)

Conventions:
  - Each subcommand module exposes one public `execute_*` function
    returning `anyhow::Result<()>`.
  - Argument structs derive `clap::Args`; the tree path is filled in by
    `main.rs` from the global `--tree` flag / `CMDWALK_TREE`.
*/

pub mod format;
pub mod list;
pub mod parse;
pub mod send;
pub mod shared;

pub use list::{ListArgs, execute_list};
pub use parse::{ParseArgs, execute_parse};
pub use send::{SendArgs, execute_send};
