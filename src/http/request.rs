//! Engine-side request.
//!
//! # Responsibilities
//! - Hold everything a handler or binder may read: verb, path, multi-valued
//!   params, headers, cookies, body, and a side-channel for transport artifacts
//! - Derive host/port, content type, charset, accept-languages and the
//!   effective verb (method override) from raw headers
//!
//! # Design Decisions
//! - Owned by exactly one in-flight call, never shared
//! - Parameter map keeps insertion order per name (`Vec<String>`)
//! - Header derivation is pure so it can be tested without a listener

use std::collections::{BTreeMap, HashMap};

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::action::Verb;
use crate::http::cookie::Cookie;

/// Side-channel key holding the raw body text.
pub const ARG_BODY: &str = "body";
/// Side-channel key holding uploaded files.
pub const ARG_FILES: &str = "files";
/// Side-channel key selecting by-name RPC payloads.
pub const ARG_USE_PARAMETER_NAMES: &str = "useParameterNames";
/// Side-channel key holding an opaque session id.
pub const ARG_SESSION: &str = "session";

pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

const DEFAULT_ENCODING: &str = "UTF-8";
const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// A decoded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field name.
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Transport artifacts passed through to binders.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Text(String),
    Flag(bool),
    Files(BTreeMap<String, UploadedFile>),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub verb: Verb,
    pub path: String,
    pub query_string: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub remote_address: Option<String>,
    pub params: BTreeMap<String, Vec<String>>,
    pub headers: HeaderMap,
    pub cookies: BTreeMap<String, Cookie>,
    pub body: Vec<u8>,
    pub args: HashMap<String, Arg>,
    pub content_type: String,
    pub encoding: String,
    pub keep_alive: bool,
    pub accept_languages: Vec<String>,
}

impl Request {
    /// Build a request for `uri`, decoding its query string into params.
    pub fn new(verb: Verb, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (uri, None),
        };

        let mut request = Self {
            verb,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query_string: None,
            host: None,
            port: 80,
            remote_address: None,
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            body: Vec::new(),
            args: HashMap::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            keep_alive: true,
            accept_languages: Vec::new(),
        };

        if let Some(query) = query {
            request.add_form_params(query.as_bytes());
            request.query_string = Some(query);
        }

        request
    }

    /// Build a request from transport parts and derive header-backed fields.
    pub fn from_parts(
        verb: Verb,
        uri: &str,
        headers: HeaderMap,
        body: Vec<u8>,
        remote: Option<String>,
    ) -> Self {
        let mut request = Self::new(verb, uri);
        request.headers = headers;
        request.body = body;
        request.remote_address = remote;
        request.apply_headers();
        request
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Append a header; names or values not valid on the wire are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Ignoring invalid request header"),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, arg: Arg) -> Self {
        self.args.insert(key.into(), arg);
        self
    }

    /// First value of a parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every parameter reduced to its first value.
    pub fn flat_params(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .filter_map(|(k, v)| v.first().map(|first| (k.clone(), first.clone())))
            .collect()
    }

    /// First value of `name`, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// Body text: the side-channel copy when present, else the raw bytes.
    pub fn body_text(&self) -> String {
        match self.args.get(ARG_BODY) {
            Some(Arg::Text(text)) => text.clone(),
            _ => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    pub fn files(&self) -> BTreeMap<String, UploadedFile> {
        match self.args.get(ARG_FILES) {
            Some(Arg::Files(files)) => files.clone(),
            _ => BTreeMap::new(),
        }
    }

    pub fn use_parameter_names(&self) -> bool {
        matches!(self.args.get(ARG_USE_PARAMETER_NAMES), Some(Arg::Flag(true)))
    }

    pub fn session(&self) -> Option<&str> {
        match self.args.get(ARG_SESSION) {
            Some(Arg::Text(id)) => Some(id),
            _ => None,
        }
    }

    /// Decode `a=1&b=2` pairs into the parameter map.
    pub fn add_form_params(&mut self, encoded: &[u8]) {
        for (name, value) in url::form_urlencoded::parse(encoded) {
            self.params
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }

    fn apply_headers(&mut self) {
        if let Some(host) = self.header("host").map(str::to_string) {
            match host.split_once(':') {
                Some((name, port)) => {
                    self.host = Some(name.to_string());
                    self.port = port.parse().unwrap_or(80);
                }
                None => self.host = Some(host),
            }
        }

        for value in self.headers.get_all("cookie") {
            let Ok(value) = value.to_str() else { continue };
            for cookie in Cookie::parse_header(value) {
                self.cookies.insert(cookie.name.clone(), cookie);
            }
        }

        // The socket pseudo-verb only comes from an upgrade.
        if let Some(verb) = self
            .header(METHOD_OVERRIDE_HEADER)
            .and_then(|v| v.parse::<Verb>().ok())
            .filter(|verb| *verb != Verb::Ws)
        {
            self.verb = verb;
        }

        if let Some(forwarded) = self.header("x-forwarded-for") {
            self.remote_address = Some(forwarded.to_string());
        }

        if let Some(content_type) = self.header("content-type").map(str::to_string) {
            let (content_type, encoding) = parse_content_type(&content_type);
            self.content_type = content_type;
            if let Some(encoding) = encoding {
                self.encoding = encoding;
            }
        }

        self.keep_alive = !self
            .header("connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"));

        if let Some(accept) = self.header("accept-language") {
            self.accept_languages = parse_accept_language(accept);
        }

        if self.content_type == "application/x-www-form-urlencoded" {
            let body = std::mem::take(&mut self.body);
            self.add_form_params(&body);
            self.body = body;
        }
    }
}

/// Split `text/html; charset="utf-8"` into a lowercase media type and charset.
fn parse_content_type(header: &str) -> (String, Option<String>) {
    let mut parts = header.split(';');
    let media = parts
        .next()
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let charset = parts.find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        (!value.is_empty()).then(|| value.to_string())
    });

    (media, charset)
}

/// Languages ordered by descending q-value, ties kept in header order.
fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(f64, String)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let lang = parts.next()?.trim();
            if lang.is_empty() {
                return None;
            }
            let q = parts
                .find_map(|p| p.trim().strip_prefix("q=").and_then(|q| q.parse::<f64>().ok()))
                .unwrap_or(1.0);
            Some((q, lang.to_string()))
        })
        .collect();

    weighted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    weighted.into_iter().map(|(_, lang)| lang).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_query_string_params() {
        let request = Request::new(Verb::Get, "/search?q=rust&tag=a&tag=b%20c");
        assert_eq!(request.path, "/search");
        assert_eq!(request.query_string.as_deref(), Some("q=rust&tag=a&tag=b%20c"));
        assert_eq!(request.param("q"), Some("rust"));
        assert_eq!(request.params["tag"], vec!["a".to_string(), "b c".to_string()]);
    }

    #[test]
    fn test_header_derivation() {
        let request = Request::from_parts(
            Verb::Post,
            "/users",
            headers(&[
                ("host", "example.com:8080"),
                ("content-type", "application/json; charset='euc-kr'"),
                ("cookie", "sid=1; theme=dark"),
                ("x-http-method-override", "PUT"),
                ("accept-language", "en;q=0.5, ko, fr;q=0.8"),
            ]),
            b"{}".to_vec(),
            Some("10.0.0.1".into()),
        );

        assert_eq!(request.host.as_deref(), Some("example.com"));
        assert_eq!(request.port, 8080);
        assert_eq!(request.content_type, "application/json");
        assert_eq!(request.encoding, "euc-kr");
        assert_eq!(request.verb, Verb::Put);
        assert_eq!(request.cookie("theme").map(|c| c.value.as_str()), Some("dark"));
        assert_eq!(request.accept_languages, vec!["ko", "fr", "en"]);
        assert_eq!(request.remote_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_method_override_cannot_select_socket_verb() {
        let request = Request::from_parts(
            Verb::Post,
            "/echo",
            headers(&[("x-http-method-override", "WS")]),
            Vec::new(),
            None,
        );
        assert_eq!(request.verb, Verb::Post);

        let request = Request::new(Verb::Get, "/").with_header("X-Trace", "abc");
        assert_eq!(request.header("x-trace"), Some("abc"));
    }

    #[test]
    fn test_form_body_params() {
        let request = Request::from_parts(
            Verb::Post,
            "/login?next=%2Fhome",
            headers(&[("content-type", "application/x-www-form-urlencoded")]),
            b"user=alice&remember=true".to_vec(),
            None,
        );

        assert_eq!(request.param("user"), Some("alice"));
        assert_eq!(request.param("next"), Some("/home"));
        assert_eq!(request.flat_params().len(), 3);
    }

    #[test]
    fn test_body_text_prefers_side_channel() {
        let request = Request::new(Verb::Post, "/rpc")
            .with_body("raw")
            .with_arg(ARG_BODY, Arg::Text("[]".into()));
        assert_eq!(request.body_text(), "[]");
        assert!(!request.use_parameter_names());
    }
}
