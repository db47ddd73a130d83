//! Dispatch error taxonomy.
//!
//! # Design Decisions
//! - Every failure carries a class (`TypeTag`) so catch aspects can match
//!   engine failures and handler failures with one rule
//! - Binding failures never surface here; they degrade to default values

use axum::http::StatusCode;

use crate::action::Verb;
use crate::param::TypeTag;

pub const NOT_FOUND_EXCEPTION: &str = "NotFoundException";
pub const VALIDATION_EXCEPTION: &str = "ValidationException";
pub const ILLEGAL_ARGUMENT_EXCEPTION: &str = "IllegalArgumentException";
pub const UNSUPPORTED_OPERATION_EXCEPTION: &str = "UnsupportedOperationException";
pub const INVALID_VIEW_EXCEPTION: &str = "InvalidViewException";

/// Failure raised by a handler or aspect body.
#[derive(Debug, thiserror::Error)]
#[error("{class}: {message}")]
pub struct HandlerError {
    pub class: TypeTag,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(class: TypeTag, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TypeTag::error(NOT_FOUND_EXCEPTION), message)
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(TypeTag::error(ILLEGAL_ARGUMENT_EXCEPTION), message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }
}

/// First parameter that failed a validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{parameter} is not valid")]
pub struct ValidationError {
    /// Source name of the parameter.
    pub parameter: String,
    /// Marker whose validator rejected the value.
    pub marker: String,
}

/// Everything `dispatch` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no route for {verb} {path}")]
    RouteNotFound { verb: Verb, path: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no overload of {path} accepts the payload")]
    RpcShapeMismatch { path: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("no view available to render {0}")]
    InvalidView(String),
}

impl DispatchError {
    /// Class used for catch-aspect matching and RPC error bodies.
    pub fn class(&self) -> TypeTag {
        match self {
            DispatchError::RouteNotFound { .. } => TypeTag::error(NOT_FOUND_EXCEPTION),
            DispatchError::Validation(_) => TypeTag::error(VALIDATION_EXCEPTION),
            DispatchError::RpcShapeMismatch { .. } => TypeTag::error(ILLEGAL_ARGUMENT_EXCEPTION),
            DispatchError::MalformedPayload(_) => TypeTag::error(UNSUPPORTED_OPERATION_EXCEPTION),
            DispatchError::Handler(e) => e.class.clone(),
            DispatchError::InvalidView(_) => TypeTag::error(INVALID_VIEW_EXCEPTION),
        }
    }

    /// True for "nothing here", whether raised by routing or by a handler.
    pub fn is_not_found(&self) -> bool {
        self.class().is_a(&TypeTag::new(NOT_FOUND_EXCEPTION))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            _ if self.is_not_found() => StatusCode::NOT_FOUND,
            DispatchError::Validation(_)
            | DispatchError::RpcShapeMismatch { .. }
            | DispatchError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            DispatchError::Handler(_) | DispatchError::InvalidView(_) | DispatchError::RouteNotFound { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Human-readable message without the class prefix.
    pub fn message(&self) -> String {
        match self {
            DispatchError::Handler(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    /// The error and its source chain, one per line.
    pub fn trace(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.class(), self.message())];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            lines.push(format!("caused by: {}", err));
            source = err.source();
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = DispatchError::RouteNotFound {
            verb: Verb::Get,
            path: "/x".into(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let validation = DispatchError::from(ValidationError {
            parameter: "name".into(),
            marker: "Required".into(),
        });
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.to_string(), "name is not valid");

        let shape = DispatchError::RpcShapeMismatch { path: "/calc/add".into() };
        assert_eq!(shape.status(), StatusCode::BAD_REQUEST);

        let boom = DispatchError::from(HandlerError::new(TypeTag::error("IOException"), "boom"));
        assert_eq!(boom.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(DispatchError::InvalidView("/x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_handler_not_found_maps_to_404() {
        let missing = TypeTag::new("UserMissing").extends(&TypeTag::error(NOT_FOUND_EXCEPTION));
        let err = DispatchError::from(HandlerError::new(missing, "no user 7"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "no user 7");
    }

    #[test]
    fn test_trace_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = DispatchError::from(HandlerError::new(TypeTag::error("IOException"), "save failed").with_source(io));
        let trace = err.trace();
        assert!(trace.starts_with("IOException: save failed"));
        assert!(trace.contains("caused by: disk gone"));
    }
}
