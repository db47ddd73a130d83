//! The built engine: one entry point per surface.
//!
//! # Responsibilities
//! - HTTP: route, dispatch, map failures through the responder
//! - RPC: set the naming flag, resolve the overload, render JSON or the error body
//! - Sockets: answer inbound messages, expose the push hub
//! - Record a metric per dispatched request

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::action::{Action, Verb};
use crate::dispatch::{DispatchError, Dispatcher, Responder, RpcErrorBody};
use crate::http::request::{Arg, ARG_BODY, ARG_USE_PARAMETER_NAMES};
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::HttpRouter;
use crate::rpc::{dispatch_rpc, RpcRouter};
use crate::socket::SocketHub;

pub struct Engine {
    router: HttpRouter,
    rpc: RpcRouter,
    dispatcher: Arc<Dispatcher>,
    responder: Responder,
    sockets: SocketHub,
    parameter_names_header: String,
}

impl Engine {
    pub(crate) fn new(
        router: HttpRouter,
        rpc: RpcRouter,
        dispatcher: Arc<Dispatcher>,
        responder: Responder,
        sockets: SocketHub,
        parameter_names_header: String,
    ) -> Self {
        Self {
            router,
            rpc,
            dispatcher,
            responder,
            sockets,
            parameter_names_header,
        }
    }

    pub fn router(&self) -> &HttpRouter {
        &self.router
    }

    pub fn rpc_router(&self) -> &RpcRouter {
        &self.rpc
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sockets(&self) -> &SocketHub {
        &self.sockets
    }

    pub fn route(&self, request: &Request) -> Action {
        self.router.route(request.verb, &request.path)
    }

    pub fn dispatch(&self, action: &Action, request: &mut Request, response: &mut Response) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(action, request, response)
    }

    /// Route and dispatch one HTTP request. Failures become error responses.
    pub fn handle(&self, mut request: Request) -> Response {
        let start = Instant::now();
        let mut response = Response::new();

        let action = self.route(&request);
        if let Err(err) = self.dispatch(&action, &mut request, &mut response) {
            self.responder.respond(&err, &request, &mut response);
        }

        metrics::record_dispatch("http", request.verb.as_str(), response.status.as_u16(), action.kind(), start);
        response
    }

    /// Resolve `path` (already stripped of the RPC prefix) against the
    /// candidate table without invoking anything.
    pub fn route_rpc(&self, path: &str, request: &Request) -> Action {
        self.rpc.route(path, request)
    }

    /// Resolve and invoke an RPC call. The body is always JSON.
    pub fn handle_rpc(&self, path: &str, mut request: Request) -> Response {
        let start = Instant::now();
        let mut response = Response::new();

        if let Some(value) = request.header(&self.parameter_names_header) {
            let by_name = value.trim().eq_ignore_ascii_case("true");
            request
                .args
                .insert(ARG_USE_PARAMETER_NAMES.to_string(), Arg::Flag(by_name));
        }

        let outcome = self
            .rpc
            .resolve(path, &request)
            .and_then(|found| dispatch_rpc(&self.dispatcher, &found, &mut request, &mut response));
        let kind = match &outcome {
            Ok(()) => "method",
            Err(DispatchError::RouteNotFound { .. }) => "null",
            Err(_) => "invalid",
        };
        if let Err(err) = outcome {
            self.responder.respond_rpc(&err, &request, &mut response);
        }

        metrics::record_dispatch("rpc", request.verb.as_str(), response.status.as_u16(), kind, start);
        response
    }

    /// True when `path` has a socket handler or push actions.
    pub fn accepts_socket(&self, path: &str) -> bool {
        self.sockets.has_pushes(path) || self.router.route(Verb::Ws, path).as_method().is_some()
    }

    /// Dispatch a text message received on a channel bound to `path`.
    ///
    /// The message becomes the body of a copy of the handshake request. The
    /// reply is the JSON of the result, or the error body; `None` when there
    /// is no handler or the handler returned nothing.
    pub fn on_message(&self, path: &str, handshake: &Request, text: &str) -> Option<String> {
        let start = Instant::now();
        let Action::Method(method) = self.router.route(Verb::Ws, path) else {
            tracing::debug!(path = %path, "No socket handler for message");
            return None;
        };

        let mut request = handshake.clone();
        request.verb = Verb::Ws;
        request.path = path.to_string();
        request.body = text.as_bytes().to_vec();
        request.args.insert(ARG_BODY.to_string(), Arg::Text(text.to_string()));
        let mut response = Response::new();

        let reply = match self.dispatcher.invoke(&method, &mut request, &mut response) {
            Ok(rendered) => {
                metrics::record_dispatch("socket", Verb::Ws.as_str(), 200, "method", start);
                let json = rendered.model.to_json();
                (!json.is_null()).then(|| json.to_string())
            }
            Err(err) => {
                tracing::debug!(path = %path, action = %method.name(), error = %err, "Socket message failed");
                metrics::record_dispatch("socket", Verb::Ws.as_str(), err.status().as_u16(), "method", start);
                serde_json::to_string(&RpcErrorBody::from_error(&err)).ok()
            }
        };
        reply
    }

    /// Every HTTP route, RPC path and push path, for startup logging.
    pub fn log_routes(&self) {
        self.router.log_routes();

        let rpc: BTreeMap<String, Vec<String>> = self.rpc.entries();
        for (path, signatures) in rpc {
            for signature in signatures {
                tracing::info!(path = %path, candidate = %signature, "RPC route");
            }
        }
        for path in self.sockets.push_paths() {
            tracing::info!(path = %path, "Push route");
        }
    }
}
