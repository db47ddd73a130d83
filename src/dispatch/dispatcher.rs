//! Turns a resolved `Action` into a filled-in `Response`.
//!
//! # Responsibilities
//! - Method actions: bind, run the interceptor lifecycle, render the view
//! - Static actions: redirects, bytes and conditional-GET headers
//! - Status actions: fixed status, no body
//! - Null / Invalid: surface as errors for the responder

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use crate::action::{Action, MethodAction, StaticAction};
use crate::binder::BinderManager;
use crate::dispatch::error::DispatchError;
use crate::dispatch::lifecycle::{self, Rendered};
use crate::dispatch::view::ViewResolver;
use crate::http::{Request, Response};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Emit caching headers and honour `If-Modified-Since` for static resources.
    pub static_cache: bool,
    pub cache_ttl: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            static_cache: false,
            cache_ttl: Duration::from_secs(86_400),
        }
    }
}

pub struct Dispatcher {
    binders: Arc<BinderManager>,
    views: ViewResolver,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(binders: Arc<BinderManager>, views: ViewResolver, settings: DispatchSettings) -> Self {
        Self {
            binders,
            views,
            settings,
        }
    }

    pub fn binders(&self) -> &BinderManager {
        &self.binders
    }

    pub fn views(&self) -> &ViewResolver {
        &self.views
    }

    pub fn dispatch(&self, action: &Action, request: &mut Request, response: &mut Response) -> Result<(), DispatchError> {
        tracing::debug!(verb = %request.verb, path = %request.path, action = %action, "Dispatching");

        match action {
            Action::Null => Err(DispatchError::RouteNotFound {
                verb: request.verb,
                path: request.path.clone(),
            }),
            Action::Invalid => Err(DispatchError::RpcShapeMismatch {
                path: request.path.clone(),
            }),
            Action::Status(status) => {
                response.status = status.status;
                Ok(())
            }
            Action::Static(resource) => {
                self.serve_static(resource, request, response);
                Ok(())
            }
            Action::Method(method) => {
                let rendered = self.invoke(method, request, response)?;
                self.render(rendered, request, response)
            }
        }
    }

    /// Bind from request params plus path variables, then run the lifecycle.
    pub fn invoke(
        &self,
        action: &MethodAction,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Rendered, DispatchError> {
        let binders = self.binders.as_ref();
        lifecycle::execute(binders, action, request, response, |request| {
            let mut values = request.params.clone();
            values.extend(action.path_variables(&request.path));
            Ok(binders.bind_arguments(request, &action.params, &values, None)?.values)
        })
    }

    /// Run the lifecycle with every parameter at its default.
    pub fn invoke_with_defaults(
        &self,
        action: &MethodAction,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Rendered, DispatchError> {
        let binders = self.binders.as_ref();
        lifecycle::execute(binders, action, request, response, |request| {
            Ok(binders
                .bind_arguments(request, &action.params, &Default::default(), None)?
                .values)
        })
    }

    pub fn render(&self, rendered: Rendered, request: &Request, response: &mut Response) -> Result<(), DispatchError> {
        let view = self.views.resolve(rendered.view.as_deref())?;
        view.render(rendered.model, request, response)
    }

    fn serve_static(&self, resource: &StaticAction, request: &Request, response: &mut Response) {
        let Some(contents) = &resource.contents else {
            response.status = StatusCode::MOVED_PERMANENTLY;
            response.header("location", format!("{}/", resource.path));
            return;
        };

        if !self.settings.static_cache {
            response.content_type = Some(resource.content_type.clone());
            response.output = Some(contents.to_vec());
            return;
        }

        let now = Utc::now();
        let not_modified = request
            .header("if-modified-since")
            .and_then(parse_http_date)
            .is_some_and(|since| since.timestamp() == resource.last_modified.timestamp());

        if not_modified {
            response.status = StatusCode::NOT_MODIFIED;
            response.header("date", http_date(now));
            return;
        }

        let ttl = self.settings.cache_ttl;
        let expires = now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        response.header("date", http_date(now));
        response.header("expires", http_date(expires));
        response.header("cache-control", format!("private, max-age={}", ttl.as_secs()));
        response.header("last-modified", http_date(resource.last_modified));
        response.content_type = Some(resource.content_type.clone());
        response.output = Some(contents.to_vec());
    }
}
