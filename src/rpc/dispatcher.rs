//! Invocation of a matched RPC candidate.

use serde_json::Value as Json;

use crate::binder::builtin::ContextBinder;
use crate::binder::BindContext;
use crate::dispatch::error::DispatchError;
use crate::dispatch::lifecycle;
use crate::dispatch::view::{JsonView, View};
use crate::dispatch::Dispatcher;
use crate::http::{Request, Response};
use crate::param::{TypeRef, Value};
use crate::rpc::router::RpcMatch;

/// Handler arguments in declaration order: payload fields converted to their
/// declared types (`Null` when they don't fit), context parameters resolved
/// from the call.
pub fn rpc_arguments(found: &RpcMatch, request: &Request) -> Vec<Value> {
    let ctx = BindContext::new(request);
    let mut position = 0;

    found
        .action
        .params
        .iter()
        .map(|param| {
            if let TypeRef::Context(kind) = &param.ty {
                return ContextBinder::resolve(&ctx.with_param(param), *kind);
            }

            let node = match &found.payload {
                Json::Object(fields) => fields.get(param.source_name()),
                Json::Array(items) => {
                    position += 1;
                    items.get(position - 1)
                }
                _ => None,
            };
            node.map(|n| Value::from_json(&param.ty, n)).unwrap_or(Value::Null)
        })
        .collect()
}

/// Run the candidate through its interceptors and always render JSON.
pub fn dispatch_rpc(
    dispatcher: &Dispatcher,
    found: &RpcMatch,
    request: &mut Request,
    response: &mut Response,
) -> Result<(), DispatchError> {
    let args = rpc_arguments(found, request);
    tracing::debug!(action = %found.action.name(), args = args.len(), "Invoking RPC candidate");

    let rendered = lifecycle::execute(dispatcher.binders(), &found.action, request, response, move |_| Ok(args))?;
    JsonView.render(rendered.model, request, response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::action::method::{Call, MethodAction, Model, Reply};
    use crate::action::Verb;
    use crate::binder::BinderManager;
    use crate::dispatch::view::{ViewResolver, HTML_VIEW};
    use crate::dispatch::DispatchSettings;
    use crate::interceptor::InterceptorSet;
    use crate::param::{ContextType, ParamDescriptor};

    fn add_ints() -> Arc<MethodAction> {
        Arc::new(MethodAction {
            handler_type: "Calc".into(),
            method: "add".into(),
            verb: Verb::Post,
            pattern: "/calc/add".into(),
            params: vec![
                ParamDescriptor::context(ContextType::Request),
                ParamDescriptor::new("a", TypeRef::int()),
                ParamDescriptor::new("b", TypeRef::int()),
            ],
            markers: Vec::new(),
            view: Some(HTML_VIEW.into()),
            interceptors: InterceptorSet::default(),
            handler: Arc::new(|call: &mut Call<'_>| {
                let sum = call.arg(1).as_i64().unwrap_or(0) + call.arg(2).as_i64().unwrap_or(0);
                Ok(Reply::model(Model::Json(json!(sum))))
            }),
        })
    }

    #[test]
    fn test_arguments_by_position_and_name() {
        let request = Request::new(Verb::Post, "/calc/add");
        let positional = RpcMatch {
            action: add_ints(),
            payload: json!([1, 2]),
        };
        assert_eq!(
            rpc_arguments(&positional, &request),
            vec![Value::Context(ContextType::Request), Value::Int(1), Value::Int(2)]
        );

        let named = RpcMatch {
            action: add_ints(),
            payload: json!({"b": 5, "a": 4}),
        };
        assert_eq!(rpc_arguments(&named, &request)[1..], [Value::Int(4), Value::Int(5)]);
    }

    #[test]
    fn test_result_is_always_json() {
        let dispatcher = Dispatcher::new(
            Arc::new(BinderManager::with_defaults()),
            ViewResolver::new(HTML_VIEW),
            DispatchSettings {
                static_cache: false,
                cache_ttl: Duration::from_secs(1),
            },
        );
        let found = RpcMatch {
            action: add_ints(),
            payload: json!([20, 22]),
        };
        let mut request = Request::new(Verb::Post, "/calc/add");
        let mut response = Response::new();
        dispatch_rpc(&dispatcher, &found, &mut request, &mut response).unwrap();

        assert_eq!(response.body_text(), "42");
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
    }
}
