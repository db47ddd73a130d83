//! Literal-table actions: static resources and fixed statuses.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};

/// A static resource, or a redirect to its slash form when `contents` is absent.
#[derive(Debug, Clone)]
pub struct StaticAction {
    /// Request path that resolved to this resource.
    pub path: String,
    pub contents: Option<Arc<[u8]>>,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

impl StaticAction {
    pub fn file(
        path: impl Into<String>,
        resource: &str,
        contents: impl Into<Arc<[u8]>>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            contents: Some(contents.into()),
            content_type: content_type_for(resource).to_string(),
            last_modified,
        }
    }

    /// Redirect `path` to `path/`.
    pub fn redirect(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: None,
            content_type: String::new(),
            last_modified: Utc::now(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.contents.is_none()
    }
}

/// A path answered with a fixed status and no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAction {
    pub path: String,
    pub status: StatusCode,
}

/// Media type guessed from a resource's extension.
pub fn content_type_for(resource: &str) -> &'static str {
    let ext = resource
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
