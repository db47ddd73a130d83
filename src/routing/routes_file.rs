//! Line-oriented literal route files.
//!
//! ```text
//! # comment
//! GET  /favicon.ico  404
//! GET  /assets/      staticDir:public
//! GET  /robots.txt   file:public/robots.txt
//! ```

use std::path::{Path, PathBuf};

use crate::action::Verb;
use crate::routing::static_router::{StaticRoute, StaticTarget};

#[derive(Debug, thiserror::Error)]
pub enum RoutesFileError {
    #[error("failed to read routes file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

pub fn load_routes_file(path: &Path) -> Result<Vec<StaticRoute>, RoutesFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| RoutesFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_routes(&content)
}

pub fn parse_routes(content: &str) -> Result<Vec<StaticRoute>, RoutesFileError> {
    let mut routes = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let syntax = |message: String| RoutesFileError::Syntax {
            line: index + 1,
            message,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [verb, path, target] = fields.as_slice() else {
            return Err(syntax(format!("expected `VERB /path target`, got `{line}`")));
        };

        let verb: Verb = verb.parse().map_err(|e| syntax(format!("{e}")))?;
        if !path.starts_with('/') {
            return Err(syntax(format!("path `{path}` must start with `/`")));
        }
        let target: StaticTarget = target.parse().map_err(|e| syntax(format!("{e}")))?;

        routes.push(StaticRoute {
            verb,
            path: (*path).to_string(),
            target,
        });
    }

    Ok(routes)
}
