//! Named rendering strategies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::action::method::Model;
use crate::dispatch::error::DispatchError;
use crate::http::{Request, Response};

pub const JSON_VIEW: &str = "json";
pub const HTML_VIEW: &str = "html";
pub const RAW_VIEW: &str = "raw";
pub const REDIRECT_VIEW: &str = "redirect";

/// Writes a model onto the outgoing response.
pub trait View: Send + Sync {
    fn render(&self, model: Model, request: &Request, response: &mut Response) -> Result<(), DispatchError>;
}

pub struct JsonView;

impl View for JsonView {
    fn render(&self, model: Model, _request: &Request, response: &mut Response) -> Result<(), DispatchError> {
        response.content_type = Some("application/json".to_string());
        if matches!(model, Model::Empty) {
            return Ok(());
        }
        let body = serde_json::to_vec(&model.to_json()).map_err(|e| DispatchError::InvalidView(e.to_string()))?;
        response.output = Some(body);
        Ok(())
    }
}

/// Text as-is under `text/html`; no templating.
pub struct HtmlView;

impl View for HtmlView {
    fn render(&self, model: Model, _request: &Request, response: &mut Response) -> Result<(), DispatchError> {
        response.content_type = Some("text/html".to_string());
        response.output = match model {
            Model::Empty => None,
            Model::Text(text) => Some(text.into_bytes()),
            Model::Bytes(bytes) => Some(bytes),
            other => Some(other.to_message().into_bytes()),
        };
        Ok(())
    }
}

/// Copies a handler-built response onto the outgoing one.
pub struct RawView;

impl View for RawView {
    fn render(&self, model: Model, _request: &Request, response: &mut Response) -> Result<(), DispatchError> {
        let Model::Raw(raw) = model else {
            return Err(DispatchError::InvalidView(format!("{RAW_VIEW} view needs a response model")));
        };

        response.status = raw.status;
        response.encoding = raw.encoding;
        response.content_type = raw.content_type;
        response.output = raw.output;
        for cookie in raw.cookies {
            response.set_cookie(cookie);
        }
        for (name, value) in raw.headers.iter() {
            response.headers.append(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// 301 to the model's URL; relative URLs are made absolute against the
/// request's host and port.
pub struct RedirectView;

impl View for RedirectView {
    fn render(&self, model: Model, request: &Request, response: &mut Response) -> Result<(), DispatchError> {
        let url = match model {
            Model::Text(url) => url,
            Model::Json(serde_json::Value::String(url)) => url,
            _ => return Err(DispatchError::InvalidView(format!("{REDIRECT_VIEW} view needs a URL"))),
        };

        let location = if url.starts_with("http") {
            url
        } else {
            let host = request.host.as_deref().unwrap_or("localhost");
            format!("http://{}:{}{}", host, request.port, url)
        };
        response.status = StatusCode::MOVED_PERMANENTLY;
        response.header("location", location);
        Ok(())
    }
}

pub struct ViewResolver {
    views: HashMap<String, Arc<dyn View>>,
    default: String,
}

impl ViewResolver {
    /// Built-in views, with `default` used when none is named.
    pub fn new(default: impl Into<String>) -> Self {
        let mut views: HashMap<String, Arc<dyn View>> = HashMap::new();
        views.insert(JSON_VIEW.to_string(), Arc::new(JsonView));
        views.insert(HTML_VIEW.to_string(), Arc::new(HtmlView));
        views.insert(RAW_VIEW.to_string(), Arc::new(RawView));
        views.insert(REDIRECT_VIEW.to_string(), Arc::new(RedirectView));
        Self {
            views,
            default: default.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, view: Arc<dyn View>) {
        let name = name.into();
        tracing::debug!(view = %name, "Registered view");
        self.views.insert(name, view);
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// The named view if registered, else the default. A missing default
    /// is an `InvalidView` failure.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn View>, DispatchError> {
        if let Some(view) = name.and_then(|n| self.views.get(n)) {
            return Ok(view.clone());
        }
        if let Some(name) = name {
            tracing::debug!(view = %name, fallback = %self.default, "Unknown view, using default");
        }
        self.views
            .get(&self.default)
            .cloned()
            .ok_or_else(|| DispatchError::InvalidView(name.unwrap_or(self.default.as_str()).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HOST;
    use axum::http::{HeaderMap, HeaderValue};

    use crate::action::Verb;
    use crate::http::Cookie;

    fn render(view: &dyn View, model: Model) -> Response {
        let request = Request::from_parts(
            Verb::Get,
            "/",
            HeaderMap::from_iter([(HOST, HeaderValue::from_static("example.com:8080"))]),
            Vec::new(),
            None,
        );
        let mut response = Response::new();
        view.render(model, &request, &mut response).unwrap();
        response
    }

    #[test]
    fn test_json_view() {
        let response = render(&JsonView, Model::Json(serde_json::json!({"id": 42})));
        assert_eq!(response.body_text(), "{\"id\":42}");
        assert_eq!(response.content_type.as_deref(), Some("application/json"));

        assert!(render(&JsonView, Model::Empty).output.is_none());
    }

    #[test]
    fn test_html_view() {
        let response = render(&HtmlView, Model::Text("<p>hi</p>".into()));
        assert_eq!(response.body_text(), "<p>hi</p>");
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
    }

    #[test]
    fn test_raw_view_copies_response() {
        let mut raw = Response::with_status(StatusCode::ACCEPTED);
        raw.header("x-trace", "abc");
        raw.set_cookie(Cookie::new("sid", "1"));
        raw.output = Some(b"queued".to_vec());
        raw.content_type = Some("text/plain".into());

        let response = render(&RawView, Model::Raw(raw));
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(response.headers["x-trace"], "abc");
        assert_eq!(response.cookies.len(), 1);
        assert_eq!(response.body_text(), "queued");

        let request = Request::new(Verb::Get, "/");
        assert!(RawView.render(Model::Empty, &request, &mut Response::new()).is_err());
    }

    #[test]
    fn test_redirect_view() {
        let response = render(&RedirectView, Model::Text("/login".into()));
        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers["location"], "http://example.com:8080/login");

        let response = render(&RedirectView, Model::Text("https://other.org/".into()));
        assert_eq!(response.headers["location"], "https://other.org/");
    }

    #[test]
    fn test_resolver_fallback() {
        let resolver = ViewResolver::new(JSON_VIEW);
        assert!(resolver.resolve(Some("html")).is_ok());
        assert!(resolver.resolve(Some("velocity")).is_ok());
        assert!(resolver.resolve(None).is_ok());

        let broken = ViewResolver::new("missing");
        assert!(matches!(broken.resolve(None), Err(DispatchError::InvalidView(_))));
        assert!(broken.resolve(Some("json")).is_ok());
    }
}
