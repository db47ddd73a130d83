//! Parameter binding pipeline.
//!
//! # Data Flow
//! ```text
//! raw strings for one parameter (query/form/path variables)
//!     → converter.rs (first marker with a registered converter, optional)
//!     → binder (exact type, else first assignable registration)
//!         malformed → default literal re-bound → type zero
//!     → array assembly (arrays) or first value (scalars)
//!     → validator.rs (first failing marker aborts the dispatch)
//!     → Value handed to the handler
//! ```
//!
//! # Design Decisions
//! - Binding never fails a request; only validators do
//! - Fallback order is registration order, so lookups are deterministic
//! - Validation state is a per-call `Validation`, not ambient

pub mod builtin;
pub mod converter;
pub mod manager;
pub mod validator;

use crate::dispatch::error::DispatchError;
use crate::http::Request;
use crate::param::{ParamDescriptor, TypeRef, Value};

pub use converter::{Converter, DateConverter};
pub use manager::BinderManager;
pub use validator::{EmailValidator, Ipv4AddressValidator, RangeValidator, RequiredValidator, Validation, Validator};

/// What a binder may read besides the raw value.
#[derive(Clone, Copy)]
pub struct BindContext<'a> {
    pub request: &'a Request,
    /// Absent when binding aspect arguments that have no parameter metadata.
    pub param: Option<&'a ParamDescriptor>,
    pub cause: Option<&'a DispatchError>,
}

impl<'a> BindContext<'a> {
    pub fn new(request: &'a Request) -> Self {
        Self {
            request,
            param: None,
            cause: None,
        }
    }

    pub fn with_param(mut self, param: &'a ParamDescriptor) -> Self {
        self.param = Some(param);
        self
    }

    pub fn with_cause(mut self, cause: Option<&'a DispatchError>) -> Self {
        self.cause = cause;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("cannot bind `{value}` as {target}")]
    Malformed { target: String, value: String },

    #[error("{target} is not handled by this binder")]
    Unsupported { target: String },
}

impl BindError {
    pub fn malformed(target: &TypeRef, value: &Value) -> Self {
        BindError::Malformed {
            target: target.raw_name(),
            value: format!("{:?}", value),
        }
    }
}

/// Turns one raw value into a typed value for a declared type.
pub trait Binder: Send + Sync {
    /// Convert a present value. Errors fall back to the default value.
    fn convert(&self, ctx: &BindContext<'_>, target: &TypeRef, value: Value) -> Result<Value, BindError>;

    /// Type-specific zero value.
    fn zero(&self, target: &TypeRef) -> Value {
        Value::zero_of(target)
    }

    /// The parameter's default literal re-bound through `convert`, else `zero`.
    fn default_value(&self, ctx: &BindContext<'_>, target: &TypeRef) -> Value {
        match ctx.param.and_then(|p| p.default_value.as_deref()) {
            Some(literal) => self
                .convert(ctx, target, Value::Str(literal.to_string()))
                .unwrap_or_else(|_| self.zero(target)),
            None => self.zero(target),
        }
    }

    /// Bind a possibly absent value, degrading to the default on any failure.
    fn bind(&self, ctx: &BindContext<'_>, target: &TypeRef, value: Option<Value>) -> Value {
        match value {
            None | Some(Value::Null) => self.default_value(ctx, target),
            Some(value) => match self.convert(ctx, target, value) {
                Ok(bound) => bound,
                Err(err) => {
                    tracing::debug!(
                        param = ctx.param.map(|p| p.source_name()).unwrap_or("-"),
                        error = %err,
                        "Binding failed, using default"
                    );
                    self.default_value(ctx, target)
                }
            },
        }
    }
}
