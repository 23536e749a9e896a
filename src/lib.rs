//! cmdwalk - map nested CLI subcommands onto HTTP requests.
//!
//! A [`CommandNode`] tree declares, per subcommand, how it contributes
//! to a request: path segments, body fields, query parameters, headers
//! and connection settings. Values come from literals or from
//! extractors that consume CLI tokens. [`parse`] walks the tree with a
//! token list and returns a [`ParsedCommand`]; [`Router`] adds dispatch
//! over a [`Transport`] and reports failures through a callback or the
//! returned [`RequestHandle`].
//!
//! ```
//! use cmdwalk::{CommandNode, parse, required, rest};
//!
//! let tree = CommandNode::new()
//!     .path("/jobs")
//!     .child("list", CommandNode::new())
//!     .child(
//!         "start",
//!         CommandNode::new()
//!             .method("POST")
//!             .body_field("script", required("Script name"))
//!             .body_field("args", rest()),
//!     );
//!
//! let parsed = parse(["start", "app.js"], &tree).unwrap();
//! assert_eq!(parsed.request.method(), "POST");
//! assert_eq!(parsed.request.path(), "/jobs");
//! assert_eq!(parsed.subcommands, vec!["start"]);
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod router;
pub mod serializer;
pub mod tokens;
pub mod transport;
pub mod tree;
pub mod walker;

pub use config::{TreeFormat, load_tree, tree_from_str};
pub use descriptor::{ParsedCommand, RequestDescriptor};
pub use error::{ConfigError, ParseError, RequestError, TransportError};
pub use extract::{
    ArgValue, Extractor, custom, flag, named, optional, optional_none, required, rest, unparsed,
};
pub use router::{Callback, HandleEvent, RequestHandle, Router, RouterState};
pub use serializer::Serializer;
pub use tokens::TokenBuffer;
pub use transport::{HttpTransport, OutgoingRequest, Response, Transport};
pub use tree::{ArgSpec, CommandNode, PathSpec, TransportParams};
pub use walker::{parse, parse_env};
