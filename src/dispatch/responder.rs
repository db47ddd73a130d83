//! Last stop for unrecovered dispatch failures.

use std::sync::Arc;

use serde::Serialize;

use crate::dispatch::error::DispatchError;
use crate::http::{Request, Response};

/// Renders the body of a 404.
pub trait NotFoundRenderer: Send + Sync {
    fn render(&self, request: &Request, response: &mut Response);
}

/// Plain-text 404 body naming the missing path.
pub struct PlainNotFound;

impl NotFoundRenderer for PlainNotFound {
    fn render(&self, request: &Request, response: &mut Response) {
        response.content_type = Some("text/plain".to_string());
        response.output = Some(format!("Not Found: {} {}", request.verb, request.path).into_bytes());
    }
}

/// JSON error body of the RPC surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl RpcErrorBody {
    pub fn from_error(err: &DispatchError) -> Self {
        Self {
            kind: err.class().name().to_string(),
            message: err.message(),
            stacktrace: (!matches!(err, DispatchError::RouteNotFound { .. })).then(|| err.trace()),
        }
    }
}

pub struct Responder {
    not_found: Arc<dyn NotFoundRenderer>,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(Arc::new(PlainNotFound))
    }
}

impl Responder {
    pub fn new(not_found: Arc<dyn NotFoundRenderer>) -> Self {
        Self { not_found }
    }

    /// Map `err` onto `response` as a status plus a short body.
    pub fn respond(&self, err: &DispatchError, request: &Request, response: &mut Response) {
        let status = err.status();
        log_failure(err, request, status.as_u16());

        response.status = status;
        response.cause = Some(err.trace());
        response.output = None;
        response.content_type = None;

        if err.is_not_found() {
            self.not_found.render(request, response);
        } else {
            // Server-side detail stays in the log and `cause`.
            let body = if status.is_server_error() {
                status.canonical_reason().unwrap_or("Internal Server Error").to_string()
            } else {
                err.to_string()
            };
            response.content_type = Some("text/plain".to_string());
            response.output = Some(body.into_bytes());
        }
    }

    /// Like `respond`, with the `{type, message, stacktrace}` JSON body.
    pub fn respond_rpc(&self, err: &DispatchError, request: &Request, response: &mut Response) {
        let status = err.status();
        log_failure(err, request, status.as_u16());

        response.status = status;
        response.cause = Some(err.trace());
        response.content_type = Some("application/json".to_string());
        response.output = serde_json::to_vec(&RpcErrorBody::from_error(err)).ok();
    }
}

fn log_failure(err: &DispatchError, request: &Request, status: u16) {
    if status >= 500 {
        tracing::error!(verb = %request.verb, path = %request.path, status, error = %err, "Dispatch failed");
    } else {
        tracing::debug!(verb = %request.verb, path = %request.path, status, error = %err, "Request rejected");
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::action::Verb;
    use crate::dispatch::error::{HandlerError, ValidationError};
    use crate::param::TypeTag;

    #[test]
    fn test_not_found_uses_renderer() {
        let request = Request::new(Verb::Get, "/nope");
        let mut response = Response::new();
        let err = DispatchError::RouteNotFound {
            verb: Verb::Get,
            path: "/nope".into(),
        };
        Responder::default().respond(&err, &request, &mut response);

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "Not Found: GET /nope");
    }

    #[test]
    fn test_validation_is_client_error() {
        let request = Request::new(Verb::Post, "/users");
        let mut response = Response::new();
        let err = DispatchError::from(ValidationError {
            parameter: "email".into(),
            marker: "Email".into(),
        });
        Responder::default().respond(&err, &request, &mut response);

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body_text(), "email is not valid");
    }

    #[test]
    fn test_server_error_body_is_generic() {
        let request = Request::new(Verb::Get, "/users/1");
        let mut response = Response::new();
        let err = DispatchError::from(HandlerError::new(
            TypeTag::error("IllegalStateException"),
            "pool exhausted at db-3",
        ));
        Responder::default().respond(&err, &request, &mut response);

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_text(), "Internal Server Error");
        assert!(response.cause.as_deref().unwrap().contains("pool exhausted"));
    }

    #[test]
    fn test_rpc_error_body() {
        let missing = RpcErrorBody::from_error(&DispatchError::RouteNotFound {
            verb: Verb::Post,
            path: "/calc/mul".into(),
        });
        assert_eq!(missing.kind, "NotFoundException");
        let json = serde_json::to_value(&missing).unwrap();
        assert!(json.get("stacktrace").is_none());

        let boom = RpcErrorBody::from_error(&DispatchError::from(HandlerError::new(
            TypeTag::error("ArithmeticException"),
            "divide by zero",
        )));
        let json = serde_json::to_value(&boom).unwrap();
        assert_eq!(json["type"], "ArithmeticException");
        assert_eq!(json["message"], "divide by zero");
        assert!(json["stacktrace"].as_str().unwrap().starts_with("ArithmeticException"));
    }
}
