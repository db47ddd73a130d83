//! Structural overload resolution for RPC paths.
//!
//! # Design Decisions
//! - Candidates are matched on the JSON shape only; no binder runs here
//! - Context parameters (request, session, ...) are not part of the shape
//! - By-name payloads match on the exact key set; positional ones on arity

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value as Json;

use crate::action::{Action, MethodAction};
use crate::dispatch::error::DispatchError;
use crate::http::Request;
use crate::param::{ParamDescriptor, Primitive, TypeRef, Value};

/// A candidate that accepted the payload, with the parsed payload.
#[derive(Debug, Clone)]
pub struct RpcMatch {
    pub action: Arc<MethodAction>,
    pub payload: Json,
}

/// True if `node` may be converted into `ty`.
pub fn is_compatible(ty: &TypeRef, node: &Json) -> bool {
    match ty {
        TypeRef::Primitive(p) => primitive_accepts(*p, node),
        TypeRef::Boxed(p) => node.is_null() || primitive_accepts(*p, node),
        TypeRef::Str => node.is_string() || node.is_null(),
        TypeRef::Array(_) => node.is_array(),
        TypeRef::Object(_) => node.is_object(),
        TypeRef::Generic { .. } | TypeRef::Context(_) => true,
    }
}

// Integral widths are checked here so an overflowing number is a shape mismatch.
fn primitive_accepts(p: Primitive, node: &Json) -> bool {
    Value::primitive_from_json(p, node).is_some()
}

/// Parameters that come from the payload.
pub fn payload_params(action: &MethodAction) -> impl Iterator<Item = &ParamDescriptor> {
    action.params.iter().filter(|p| !p.is_context())
}

fn matches_by_name(action: &MethodAction, fields: &serde_json::Map<String, Json>) -> bool {
    let params: Vec<_> = payload_params(action).collect();
    params.len() == fields.len()
        && params
            .iter()
            .all(|p| fields.get(p.source_name()).is_some_and(|node| is_compatible(&p.ty, node)))
}

fn matches_positional(action: &MethodAction, items: &[Json]) -> bool {
    let params: Vec<_> = payload_params(action).collect();
    params.len() == items.len()
        && params
            .iter()
            .zip(items)
            .all(|(p, node)| is_compatible(&p.ty, node))
}

#[derive(Default)]
pub struct RpcRouter {
    candidates: HashMap<String, Vec<Arc<MethodAction>>>,
}

impl RpcRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, action: Arc<MethodAction>) {
        let path = path.into();
        tracing::debug!(path = %path, action = %action.name(), "Registered RPC candidate");
        self.candidates.entry(path).or_default().push(action);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.candidates.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Path → candidate signatures, sorted.
    pub fn entries(&self) -> BTreeMap<String, Vec<String>> {
        self.candidates
            .iter()
            .map(|(path, actions)| {
                let signatures = actions
                    .iter()
                    .map(|a| {
                        let types: Vec<String> = payload_params(a).map(|p| p.ty.to_string()).collect();
                        format!("{}({})", a.name(), types.join(", "))
                    })
                    .collect();
                (path.clone(), signatures)
            })
            .collect()
    }

    /// Pick the candidate for `path` whose signature fits the request body.
    ///
    /// Unknown path or unparseable body: `RouteNotFound`. Wrong JSON root for
    /// the naming flag: `MalformedPayload`. No fitting candidate:
    /// `RpcShapeMismatch`.
    pub fn resolve(&self, path: &str, request: &Request) -> Result<RpcMatch, DispatchError> {
        let not_found = || DispatchError::RouteNotFound {
            verb: request.verb,
            path: path.to_string(),
        };

        let candidates = self.candidates.get(path).ok_or_else(not_found)?;
        let by_name = request.use_parameter_names();

        let body = request.body_text();
        let text = match body.trim() {
            "" if by_name => "{}",
            "" => "[]",
            text => text,
        };
        let payload: Json = serde_json::from_str(text).map_err(|e| {
            tracing::debug!(path = %path, error = %e, "RPC body is not JSON");
            not_found()
        })?;

        let found = match (&payload, by_name) {
            (Json::Object(fields), true) => candidates.iter().find(|a| matches_by_name(a, fields)),
            (Json::Array(items), false) => candidates.iter().find(|a| matches_positional(a, items)),
            (_, true) => return Err(DispatchError::MalformedPayload("expected a JSON object".to_string())),
            (_, false) => return Err(DispatchError::MalformedPayload("expected a JSON array".to_string())),
        };

        match found {
            Some(action) => Ok(RpcMatch {
                action: action.clone(),
                payload,
            }),
            None => Err(DispatchError::RpcShapeMismatch { path: path.to_string() }),
        }
    }

    /// `resolve` collapsed into an `Action`.
    pub fn route(&self, path: &str, request: &Request) -> Action {
        match self.resolve(path, request) {
            Ok(found) => Action::Method(found.action),
            Err(DispatchError::RouteNotFound { .. }) => Action::Null,
            Err(_) => Action::Invalid,
        }
    }
}
