//! Handler-backed actions and the call surface handlers see.
//!
//! # Responsibilities
//! - Carry everything needed to invoke one handler: params, markers, the
//!   declared view and the resolved interceptor sets
//! - Re-match the route pattern against a concrete path to extract path
//!   variables
//!
//! # Design Decisions
//! - Handlers and aspects share one signature: `Fn(&mut Call) -> Result<Reply, HandlerError>`
//! - Context objects are reached through `Call`, never copied into `Value`s

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::action::Verb;
use crate::dispatch::error::{DispatchError, HandlerError};
use crate::http::{Request, Response};
use crate::interceptor::InterceptorSet;
use crate::param::{Marker, ParamDescriptor, TypeTag, Value};
use crate::routing::tree::placeholder_name;

/// Shared signature of handlers and aspect methods.
pub type HandlerFn = Arc<dyn Fn(&mut Call<'_>) -> Result<Reply, HandlerError> + Send + Sync>;

static NULL: Value = Value::Null;

/// One handler or aspect invocation.
pub struct Call<'a> {
    args: Vec<Value>,
    request: &'a mut Request,
    response: &'a mut Response,
    cause: Option<&'a DispatchError>,
}

impl<'a> Call<'a> {
    pub fn new(
        args: Vec<Value>,
        request: &'a mut Request,
        response: &'a mut Response,
        cause: Option<&'a DispatchError>,
    ) -> Self {
        Self {
            args,
            request,
            response,
            cause,
        }
    }

    /// Bound argument at `index`, or `Null` past the end.
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&NULL)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Move an argument out, leaving `Null` behind.
    pub fn take_arg(&mut self, index: usize) -> Value {
        self.args
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, Value::Null))
            .unwrap_or(Value::Null)
    }

    pub fn request(&self) -> &Request {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut *self.request
    }

    pub fn response(&self) -> &Response {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut *self.response
    }

    /// The failure being handled, for catch aspects.
    pub fn cause(&self) -> Option<&DispatchError> {
        self.cause
    }
}

/// What a handler produced, before rendering.
#[derive(Debug)]
pub enum Model {
    Empty,
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
    /// A complete response copied onto the outgoing one by the `raw` view.
    Raw(Response),
}

impl Model {
    /// Serialize any value into a JSON model.
    pub fn json<T: Serialize>(value: &T) -> Result<Model, HandlerError> {
        serde_json::to_value(value)
            .map(Model::Json)
            .map_err(|e| HandlerError::new(TypeTag::error("SerializationException"), e.to_string()).with_source(e))
    }

    /// JSON form of the model. Text becomes a JSON string.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Model::Empty => serde_json::Value::Null,
            Model::Json(value) => value.clone(),
            Model::Text(text) => serde_json::Value::String(text.clone()),
            Model::Bytes(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
            Model::Raw(response) => serde_json::Value::String(response.body_text()),
        }
    }

    /// Text pushed to sockets: strings go out verbatim, the rest as JSON.
    pub fn to_message(&self) -> String {
        match self {
            Model::Empty => String::new(),
            Model::Text(text) => text.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// A model plus an optional view name that overrides view resolution.
#[derive(Debug)]
pub struct Reply {
    pub model: Model,
    pub view: Option<String>,
}

impl Reply {
    pub fn model(model: Model) -> Self {
        Self { model, view: None }
    }

    pub fn empty() -> Self {
        Self::model(Model::Empty)
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::model(Model::Json(value))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::model(Model::Text(text.into()))
    }

    pub fn with_view(model: Model, view: impl Into<String>) -> Self {
        Self {
            model,
            view: Some(view.into()),
        }
    }
}

/// A registered handler method.
pub struct MethodAction {
    pub handler_type: String,
    pub method: String,
    pub verb: Verb,
    pub pattern: String,
    pub params: Vec<ParamDescriptor>,
    pub markers: Vec<Marker>,
    /// View declared alongside the verb, if any.
    pub view: Option<String>,
    pub interceptors: InterceptorSet,
    pub handler: HandlerFn,
}

impl MethodAction {
    /// `Type#method`.
    pub fn name(&self) -> String {
        format!("{}#{}", self.handler_type, self.method)
    }

    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(Marker::name)
    }

    /// Values of `{name}` segments in `pattern`, read from the same positions
    /// of `path`. Empty segments are ignored on both sides.
    pub fn path_variables(&self, path: &str) -> BTreeMap<String, Vec<String>> {
        let concrete: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .enumerate()
            .filter_map(|(i, segment)| {
                let name = placeholder_name(segment)?;
                let value = concrete.get(i)?;
                Some((name.to_string(), vec![(*value).to_string()]))
            })
            .collect()
    }

    pub fn invoke(&self, call: &mut Call<'_>) -> Result<Reply, HandlerError> {
        (self.handler)(call)
    }
}

impl fmt::Debug for MethodAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodAction")
            .field("name", &self.name())
            .field("verb", &self.verb)
            .field("pattern", &self.pattern)
            .field("params", &self.params.len())
            .field("view", &self.view)
            .finish()
    }
}
