//! Router: binds a command tree to a transport.
//!
//! `request` runs the walker synchronously and then takes one of two
//! routes:
//!
//!   parsed  -> NotStarted -> Parsed -> Dispatched
//!              dispatch is spawned; its outcome goes to the callback
//!              (if any) and to the handle as a `HandleEvent`
//!   failed  -> NotStarted -> ParseFailed -> ErrorReported
//!              the transport is never contacted; the error goes to the
//!              callback right away, or, without a callback, is emitted
//!              on the handle from a spawned task so it can only arrive
//!              after `request` has returned
//!
//! Either way the error is observable: nothing raised while parsing is
//! dropped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::descriptor::ParsedCommand;
use crate::error::{ParseError, RequestError};
use crate::transport::{OutgoingRequest, Response, Transport};
use crate::tree::CommandNode;
use crate::walker;

/// Error-first completion callback.
pub type Callback = Box<dyn FnOnce(Result<Response, RequestError>) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    NotStarted,
    Parsed,
    Dispatched,
    ParseFailed,
    ErrorReported,
}

impl RouterState {
    fn can_advance_to(self, next: RouterState) -> bool {
        use RouterState::*;
        matches!(
            (self, next),
            (NotStarted, Parsed)
                | (Parsed, Dispatched)
                | (NotStarted, ParseFailed)
                | (ParseFailed, ErrorReported)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RouterState::Dispatched | RouterState::ErrorReported)
    }
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouterState::NotStarted => "not-started",
            RouterState::Parsed => "parsed",
            RouterState::Dispatched => "dispatched",
            RouterState::ParseFailed => "parse-failed",
            RouterState::ErrorReported => "error-reported",
        };
        f.write_str(s)
    }
}

/// Something a `RequestHandle` observes.
#[derive(Debug, Clone)]
pub enum HandleEvent {
    Response(Response),
    Error(RequestError),
}

/// Returned by [`Router::request`]. The request is already finalized;
/// the handle only observes its outcome.
#[derive(Debug)]
pub struct RequestHandle {
    state: RouterState,
    subcommands: Vec<String>,
    events: mpsc::UnboundedReceiver<HandleEvent>,
}

impl RequestHandle {
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Subcommands taken while parsing; empty when parsing failed.
    pub fn subcommands(&self) -> &[String] {
        &self.subcommands
    }

    /// Wait for the next event. `None` once nothing more can arrive.
    pub async fn next_event(&mut self) -> Option<HandleEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll for an event that has already been emitted.
    pub fn try_event(&mut self) -> Option<HandleEvent> {
        self.events.try_recv().ok()
    }

    /// First event as a `Result`. A failure that went to the callback
    /// resolves to [`RequestError::Reported`].
    pub async fn outcome(mut self) -> Result<Response, RequestError> {
        match self.next_event().await {
            Some(HandleEvent::Response(resp)) => Ok(resp),
            Some(HandleEvent::Error(err)) => Err(err),
            None => Err(RequestError::Reported),
        }
    }
}

pub struct Router {
    tree: Arc<CommandNode>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.tree.children.len())
            .finish_non_exhaustive()
    }
}

impl Router {
    pub fn new(tree: CommandNode, transport: impl Transport + 'static) -> Self {
        Self {
            tree: Arc::new(tree),
            transport: Arc::new(transport),
        }
    }

    pub fn tree(&self) -> &CommandNode {
        &self.tree
    }

    /// Walk the tree only; no dispatch.
    pub fn parse<I, S>(&self, tokens: I) -> Result<ParsedCommand, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        walker::parse(tokens, &self.tree)
    }

    /// [`Router::request`] over the process arguments, minus the program
    /// name.
    ///
    /// # Panics
    ///
    /// Same as [`Router::request`]: requires a Tokio runtime.
    pub fn request_env(&self, callback: Option<Callback>) -> RequestHandle {
        self.request(walker::env_tokens(), callback)
    }

    /// Parse `tokens` and dispatch the result.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; dispatch and deferred
    /// error delivery are spawned onto it.
    pub fn request<I, S>(&self, tokens: I, callback: Option<Callback>) -> RequestHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = Transitions::new();

        match walker::parse(tokens, &self.tree) {
            Ok(parsed) => {
                state.advance(RouterState::Parsed);
                let subcommands = parsed.subcommands.clone();
                let outgoing = OutgoingRequest {
                    body: parsed.serialized_body(),
                    descriptor: parsed.request,
                };
                let pending = self.transport.dispatch(outgoing);
                tokio::spawn(async move {
                    let result = pending.await.map_err(RequestError::from);
                    let event = match &result {
                        Ok(resp) => HandleEvent::Response(resp.clone()),
                        Err(err) => HandleEvent::Error(err.clone()),
                    };
                    if let Some(cb) = callback {
                        cb(result);
                    }
                    // The handle may already be gone; nobody is listening then.
                    let _ = tx.send(event);
                });
                state.advance(RouterState::Dispatched);
                RequestHandle {
                    state: state.current,
                    subcommands,
                    events: rx,
                }
            }
            Err(err) => {
                state.advance(RouterState::ParseFailed);
                warn!(error = %err, "command parse failed");
                let err = RequestError::from(err);
                match callback {
                    Some(cb) => {
                        drop(tx);
                        cb(Err(err));
                    }
                    None => {
                        tokio::spawn(async move {
                            let _ = tx.send(HandleEvent::Error(err));
                        });
                    }
                }
                state.advance(RouterState::ErrorReported);
                RequestHandle {
                    state: state.current,
                    subcommands: Vec::new(),
                    events: rx,
                }
            }
        }
    }
}

struct Transitions {
    current: RouterState,
}

impl Transitions {
    fn new() -> Self {
        Self {
            current: RouterState::NotStarted,
        }
    }

    fn advance(&mut self, next: RouterState) {
        debug_assert!(
            self.current.can_advance_to(next),
            "invalid router transition {} -> {}",
            self.current,
            next
        );
        trace!(from = %self.current, to = %next, "router state");
        self.current = next;
        if next.is_terminal() {
            debug!(state = %next, "request settled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::extract::{required, rest};
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    #[derive(Default, Clone)]
    struct Recording {
        seen: Arc<Mutex<Vec<OutgoingRequest>>>,
        fail: bool,
    }

    impl Transport for Recording {
        fn dispatch(
            &self,
            request: OutgoingRequest,
        ) -> BoxFuture<'static, Result<Response, TransportError>> {
            self.seen.lock().unwrap().push(request);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(TransportError::Other("connection refused".into()))
                } else {
                    Ok(Response {
                        status: 200,
                        headers: vec![],
                        body: b"ok".to_vec(),
                    })
                }
            })
        }
    }

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

    fn collecting() -> (Arc<Mutex<Vec<Result<Response, RequestError>>>>, Callback) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let cb: Callback = Box::new(move |r| sink.lock().unwrap().push(r));
        (calls, cb)
    }

    #[tokio::test]
    async fn parse_failure_without_callback_emits_deferred_error() {
        let transport = Recording::default();
        let router = Router::new(jobs(), transport.clone());

        let mut handle = router.request(["bogus"], None);
        assert_eq!(handle.state(), RouterState::ErrorReported);
        // Nothing has been emitted yet: the error is delivered later.
        assert!(handle.try_event().is_none());

        match handle.next_event().await {
            Some(HandleEvent::Error(RequestError::Parse(ParseError::UnknownSubcommand(t)))) => {
                assert_eq!(t, "bogus")
            }
            other => panic!("expected parse error event, got {other:?}"),
        }
        assert!(handle.next_event().await.is_none(), "exactly one event");
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parse_failure_with_callback_is_synchronous() {
        let transport = Recording::default();
        let router = Router::new(jobs(), transport.clone());
        let (calls, cb) = collecting();

        let mut handle = router.request(["start"], Some(cb));
        {
            let calls = calls.lock().unwrap();
            assert_eq!(calls.len(), 1);
            assert!(matches!(
                &calls[0],
                Err(RequestError::Parse(ParseError::MissingRequiredArgument { .. }))
            ));
        }
        assert!(handle.next_event().await.is_none(), "no event on the handle");
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn outcome_of_reported_failure() {
        let router = Router::new(jobs(), Recording::default());
        let (_calls, cb) = collecting();
        let handle = router.request(["bogus"], Some(cb));
        assert!(matches!(handle.outcome().await, Err(RequestError::Reported)));
    }

    #[tokio::test]
    async fn success_dispatches_serialized_body() {
        let transport = Recording::default();
        let router = Router::new(jobs(), transport.clone());
        let (calls, cb) = collecting();

        let mut handle = router.request(["start", "app.js", "--watch"], Some(cb));
        assert_eq!(handle.state(), RouterState::Dispatched);
        assert_eq!(handle.subcommands(), ["start".to_string()]);

        match handle.next_event().await {
            Some(HandleEvent::Response(resp)) => assert_eq!(resp.text(), "ok"),
            other => panic!("expected response, got {other:?}"),
        }
        assert!(matches!(calls.lock().unwrap().as_slice(), [Ok(r)] if r.status == 200));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].descriptor.method(), "POST");
        let body: serde_json::Value =
            serde_json::from_slice(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"script":"app.js","args":["--watch"]})
        );
    }

    #[tokio::test]
    async fn empty_body_sends_no_payload() {
        let transport = Recording::default();
        let router = Router::new(jobs(), transport.clone());
        let resp = router.request(["list"], None).outcome().await.unwrap();
        assert_eq!(resp.status, 200);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].descriptor.path(), "/jobs");
        assert!(seen[0].body.is_none());
    }

    #[tokio::test]
    async fn transport_failure_reaches_handle_and_callback() {
        let transport = Recording {
            fail: true,
            ..Recording::default()
        };
        let router = Router::new(jobs(), transport);
        let (calls, cb) = collecting();
        let err = router.request(["list"], Some(cb)).outcome().await.unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
        assert!(matches!(
            calls.lock().unwrap().as_slice(),
            [Err(RequestError::Transport(_))]
        ));
    }

    #[tokio::test]
    async fn request_env_reads_process_arguments() {
        let transport = Recording::default();
        let tree = CommandNode::new().method("POST").body_field("argv", rest());
        let router = Router::new(tree, transport.clone());

        let resp = router.request_env(None).outcome().await.unwrap();
        assert_eq!(resp.status, 200);

        let seen = transport.seen.lock().unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["argv"], serde_json::json!(walker::env_tokens()));
    }

    #[test]
    fn state_transitions() {
        use RouterState::*;
        assert!(NotStarted.can_advance_to(Parsed));
        assert!(ParseFailed.can_advance_to(ErrorReported));
        assert!(!Parsed.can_advance_to(ErrorReported));
        assert!(Dispatched.is_terminal());
        assert!(!ParseFailed.is_terminal());
    }

    #[test]
    fn router_parse_bypasses_dispatch() {
        let transport = Recording::default();
        let router = Router::new(jobs(), transport.clone());
        let parsed = router.parse(["list"]).unwrap();
        assert_eq!(parsed.subcommands, vec!["list"]);
        assert!(transport.seen.lock().unwrap().is_empty());
    }
}
