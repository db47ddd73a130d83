//! Engine-side response.
//!
//! # Responsibilities
//! - Collect status, headers, cookies and output while a call is dispatched
//! - Convert into an axum response at the transport edge
//!
//! # Design Decisions
//! - Mutated in place by dispatchers and views; the last writer wins
//! - `output == None` means "no body", distinct from an empty body

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::http::cookie::Cookie;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub cookies: Vec<Cookie>,
    pub output: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub encoding: String,
    /// Description of the failure that produced this response, if any.
    pub cause: Option<String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            output: None,
            content_type: None,
            encoding: "UTF-8".to_string(),
            cause: None,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Replace every value of `name`. Names or values not valid on the wire
    /// are dropped with a warning.
    pub fn header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| c.name != cookie.name);
        self.cookies.push(cookie);
    }

    pub fn body_text(&self) -> String {
        self.output
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// Full `Content-Type` value including the charset for textual types.
    pub fn content_type_header(&self) -> Option<String> {
        let content_type = self.content_type.as_deref()?;
        let textual = content_type.starts_with("text/")
            || content_type.ends_with("json")
            || content_type.ends_with("javascript")
            || content_type.ends_with("xml");
        if textual && !content_type.contains("charset") {
            Some(format!("{}; charset={}", content_type, self.encoding))
        } else {
            Some(content_type.to_string())
        }
    }

    /// Convert into a transport response. A content type or cookie that is
    /// not valid on the wire is dropped with a warning.
    pub fn into_http(self) -> axum::response::Response {
        let content_type = self.content_type_header();
        let mut response = axum::response::Response::new(Body::from(self.output.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        let headers = response.headers_mut();
        if let Some(content_type) = content_type {
            match HeaderValue::try_from(content_type) {
                Ok(value) => {
                    headers.insert(CONTENT_TYPE, value);
                }
                Err(_) => tracing::warn!(header = "content-type", "Dropping invalid content type"),
            }
        }
        for cookie in &self.cookies {
            match HeaderValue::try_from(cookie.encode()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(_) => tracing::warn!(cookie = %cookie.name, "Dropping invalid cookie"),
            }
        }

        response
    }
}
