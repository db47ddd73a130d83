//! BEFORE → INVOKE → AFTER, CATCH on failure, FINALLY always.

use crate::action::method::{Call, MethodAction, Model, Reply};
use crate::binder::BinderManager;
use crate::dispatch::error::DispatchError;
use crate::http::{Request, Response};
use crate::interceptor::{AspectKind, Interceptor};
use crate::param::Value;

/// A model plus the view name picked for it, before view resolution.
#[derive(Debug)]
pub struct Rendered {
    pub model: Model,
    pub view: Option<String>,
}

/// Run one method action through its interceptor chain.
///
/// `bind` produces the handler arguments and runs after the BEFORE aspects,
/// so validation failures are catchable like any other failure.
pub fn execute<B>(
    binders: &BinderManager,
    action: &MethodAction,
    request: &mut Request,
    response: &mut Response,
    bind: B,
) -> Result<Rendered, DispatchError>
where
    B: FnOnce(&Request) -> Result<Vec<Value>, DispatchError>,
{
    let outcome = match run(binders, action, request, response, bind) {
        Ok(rendered) => Ok(rendered),
        Err(err) => recover(binders, action, request, response, err),
    };

    let cause = outcome.as_ref().err();
    for finally in action.interceptors.get(AspectKind::Finally) {
        if let Err(e) = call_aspect(binders, finally, request, response, cause) {
            tracing::error!(
                action = %action.name(),
                interceptor = %finally.name(),
                error = %e,
                "Finally interceptor failed"
            );
        }
    }

    outcome
}

fn run<B>(
    binders: &BinderManager,
    action: &MethodAction,
    request: &mut Request,
    response: &mut Response,
    bind: B,
) -> Result<Rendered, DispatchError>
where
    B: FnOnce(&Request) -> Result<Vec<Value>, DispatchError>,
{
    for before in action.interceptors.get(AspectKind::Before) {
        call_aspect(binders, before, request, response, None)?;
    }

    let args = bind(request)?;
    let reply = {
        let mut call = Call::new(args, request, response, None);
        action.invoke(&mut call)?
    };

    for after in action.interceptors.get(AspectKind::After) {
        call_aspect(binders, after, request, response, None)?;
    }

    Ok(shape(reply, action.view.as_deref()))
}

fn recover(
    binders: &BinderManager,
    action: &MethodAction,
    request: &mut Request,
    response: &mut Response,
    err: DispatchError,
) -> Result<Rendered, DispatchError> {
    let class = err.class();
    let Some(catch) = action.interceptors.find_catch(&class) else {
        tracing::debug!(action = %action.name(), class = %class, "No catch interceptor matched");
        return Err(err);
    };

    tracing::debug!(
        action = %action.name(),
        interceptor = %catch.name(),
        class = %class,
        "Catch interceptor recovering"
    );
    let reply = call_aspect(binders, catch, request, response, Some(&err))?;
    Ok(shape(reply, catch.view.as_deref()))
}

fn call_aspect(
    binders: &BinderManager,
    interceptor: &Interceptor,
    request: &mut Request,
    response: &mut Response,
    cause: Option<&DispatchError>,
) -> Result<Reply, DispatchError> {
    let args = binders.context_arguments(request, &interceptor.params, cause);
    let mut call = Call::new(args, request, response, cause);
    Ok((interceptor.handler)(&mut call)?)
}

/// A view named by the reply wins over the declared one.
fn shape(reply: Reply, declared: Option<&str>) -> Rendered {
    Rendered {
        view: reply.view.or_else(|| declared.map(str::to_string)),
        model: reply.model,
    }
}
