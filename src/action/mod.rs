//! Resolvable route targets.
//!
//! # Data Flow
//! ```text
//! Registry build:
//!     RegistryBuilder → MethodAction (handler + params + interceptors)
//!     config / routes file → StaticAction, StatusAction
//!
//! Per request:
//!     HttpRouter::route → Action
//!     → Dispatcher::dispatch matches on the variant
//! ```
//!
//! # Design Decisions
//! - `Action` is cheap to clone (Arc'd payloads) so caches can hand out copies
//! - `Null` and `Invalid` are values, not errors: routers return them and the
//!   dispatcher decides the status

pub mod method;
pub mod static_action;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use method::{Call, HandlerFn, MethodAction, Model, Reply};
pub use static_action::{StaticAction, StatusAction};

/// Request verbs, including the socket pseudo-verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Head,
    Options,
    Put,
    Patch,
    Delete,
    Trace,
    Ws,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Head => "HEAD",
            Verb::Options => "OPTIONS",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Trace => "TRACE",
            Verb::Ws => "WS",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verb `{0}`")]
pub struct UnknownVerb(pub String);

impl FromStr for Verb {
    type Err = UnknownVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "HEAD" => Ok(Verb::Head),
            "OPTIONS" => Ok(Verb::Options),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            "TRACE" => Ok(Verb::Trace),
            "WS" => Ok(Verb::Ws),
            other => Err(UnknownVerb(other.to_string())),
        }
    }
}

/// A resolved route target.
#[derive(Debug, Clone)]
pub enum Action {
    Method(Arc<MethodAction>),
    Static(Arc<StaticAction>),
    Status(StatusAction),
    /// No route matched.
    Null,
    /// An RPC path exists but no overload accepts the payload shape.
    Invalid,
}

impl Action {
    pub fn is_null(&self) -> bool {
        matches!(self, Action::Null)
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Method(_) => "method",
            Action::Static(_) => "static",
            Action::Status(_) => "status",
            Action::Null => "null",
            Action::Invalid => "invalid",
        }
    }

    pub fn as_method(&self) -> Option<&Arc<MethodAction>> {
        match self {
            Action::Method(action) => Some(action),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Method(action) => write!(f, "{}", action.name()),
            Action::Static(action) => write!(f, "static:{}", action.path),
            Action::Status(action) => write!(f, "status:{}", action.status.as_u16()),
            Action::Null => f.write_str("null"),
            Action::Invalid => f.write_str("invalid"),
        }
    }
}
