//! Literal route table: fixed statuses, single files and directory mappings.
//!
//! # Responsibilities
//! - Answer exact `VERB path` entries with a `StatusAction` or a file
//! - Map directory prefixes onto a filesystem directory
//! - Redirect directory paths to their slash form
//! - Keep small file contents in a bounded cache
//!
//! # Design Decisions
//! - Longest directory prefix wins
//! - Only plain relative segments resolve under a directory mapping
//! - Files above `MAX_CACHED_FILE` are read on every lookup

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;

use crate::action::{Action, StaticAction, StatusAction, Verb};

pub const MAX_CACHED_FILE: u64 = 1024 * 1024;

const DIRECTORY_PREFIX: &str = "staticDir:";
const FILE_PREFIX: &str = "file:";
const INDEX_FILE: &str = "index.html";

/// Right-hand side of a literal route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticTarget {
    Status(StatusCode),
    Directory(PathBuf),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid static target `{0}` (expected a status code, `staticDir:<dir>` or `file:<path>`)")]
pub struct InvalidTarget(pub String);

impl FromStr for StaticTarget {
    type Err = InvalidTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(dir) = s.strip_prefix(DIRECTORY_PREFIX) {
            return Ok(StaticTarget::Directory(PathBuf::from(dir.trim())));
        }
        if let Some(file) = s.strip_prefix(FILE_PREFIX) {
            return Ok(StaticTarget::File(PathBuf::from(file.trim())));
        }
        s.parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .map(StaticTarget::Status)
            .ok_or_else(|| InvalidTarget(s.to_string()))
    }
}

impl fmt::Display for StaticTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticTarget::Status(status) => write!(f, "{}", status.as_u16()),
            StaticTarget::Directory(dir) => write!(f, "{}{}", DIRECTORY_PREFIX, dir.display()),
            StaticTarget::File(file) => write!(f, "{}{}", FILE_PREFIX, file.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoute {
    pub verb: Verb,
    pub path: String,
    pub target: StaticTarget,
}

#[derive(Clone)]
struct CachedFile {
    contents: Arc<[u8]>,
    modified: DateTime<Utc>,
}

pub struct StaticRouter {
    statuses: HashMap<(Verb, String), StatusAction>,
    files: HashMap<(Verb, String), PathBuf>,
    /// (verb, prefix ending in `/`, directory), longest prefix first.
    directories: Vec<(Verb, String, PathBuf)>,
    file_cache: Option<Mutex<LruCache<PathBuf, CachedFile>>>,
}

impl StaticRouter {
    pub fn new(file_cache_capacity: usize) -> Self {
        Self {
            statuses: HashMap::new(),
            files: HashMap::new(),
            directories: Vec::new(),
            file_cache: NonZeroUsize::new(file_cache_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn add(&mut self, route: StaticRoute) {
        tracing::debug!(verb = %route.verb, path = %route.path, target = %route.target, "Registered static route");

        match route.target {
            StaticTarget::Status(status) => {
                let action = StatusAction {
                    path: route.path.clone(),
                    status,
                };
                self.statuses.insert((route.verb, route.path), action);
            }
            StaticTarget::File(file) => {
                self.files.insert((route.verb, route.path), file);
            }
            StaticTarget::Directory(dir) => {
                let prefix = format!("{}/", route.path.trim_end_matches('/'));
                self.directories.retain(|(v, p, _)| !(*v == route.verb && *p == prefix));
                self.directories.push((route.verb, prefix, dir));
                self.directories.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.statuses.len() + self.files.len() + self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn route(&self, verb: Verb, path: &str) -> Action {
        let key = (verb, path.to_string());
        if let Some(status) = self.statuses.get(&key) {
            return Action::Status(status.clone());
        }
        if let Some(file) = self.files.get(&key) {
            return self.load(path, file);
        }

        self.directories
            .iter()
            .filter(|(v, _, _)| *v == verb)
            .find_map(|(_, prefix, dir)| self.resolve_directory(path, prefix, dir))
            .unwrap_or(Action::Null)
    }

    fn resolve_directory(&self, path: &str, prefix: &str, dir: &Path) -> Option<Action> {
        if path == prefix.trim_end_matches('/') {
            return Some(redirect(path));
        }

        let rest = path.strip_prefix(prefix)?;
        if !Path::new(rest).components().all(|c| matches!(c, Component::Normal(_))) {
            return Some(Action::Null);
        }

        let target = dir.join(rest);
        if target.is_dir() {
            if path.ends_with('/') {
                return Some(self.load(path, &target.join(INDEX_FILE)));
            }
            return Some(redirect(path));
        }
        Some(self.load(path, &target))
    }

    fn load(&self, path: &str, file: &Path) -> Action {
        if let Some(cache) = &self.file_cache {
            if let Some(hit) = cache.lock().get(file).cloned() {
                return file_action(path, file, hit);
            }
        }

        let metadata = match fs::metadata(file) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Action::Null,
        };

        let contents: Arc<[u8]> = match fs::read(file) {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Failed to read static resource");
                return Action::Null;
            }
        };
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let entry = CachedFile { contents, modified };

        if let Some(cache) = &self.file_cache {
            if metadata.len() <= MAX_CACHED_FILE {
                cache.lock().put(file.to_path_buf(), entry.clone());
            }
        }
        file_action(path, file, entry)
    }

    /// `VERB → path → target` listing.
    pub fn entries(&self) -> BTreeMap<Verb, BTreeMap<String, String>> {
        let mut out: BTreeMap<Verb, BTreeMap<String, String>> = BTreeMap::new();
        for ((verb, path), status) in &self.statuses {
            out.entry(*verb)
                .or_default()
                .insert(path.clone(), status.status.as_u16().to_string());
        }
        for ((verb, path), file) in &self.files {
            out.entry(*verb)
                .or_default()
                .insert(path.clone(), format!("{}{}", FILE_PREFIX, file.display()));
        }
        for (verb, prefix, dir) in &self.directories {
            out.entry(*verb)
                .or_default()
                .insert(prefix.clone(), format!("{}{}", DIRECTORY_PREFIX, dir.display()));
        }
        out
    }
}

fn redirect(path: &str) -> Action {
    Action::Static(Arc::new(StaticAction::redirect(path)))
}

fn file_action(path: &str, file: &Path, entry: CachedFile) -> Action {
    let resource = file.to_string_lossy();
    Action::Static(Arc::new(StaticAction::file(path, &resource, entry.contents, entry.modified)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, StaticRouter) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();

        let mut router = StaticRouter::new(8);
        router.add(StaticRoute {
            verb: Verb::Get,
            path: "/assets/".into(),
            target: StaticTarget::Directory(dir.path().to_path_buf()),
        });
        router.add(StaticRoute {
            verb: Verb::Get,
            path: "/gone".into(),
            target: StaticTarget::Status(StatusCode::GONE),
        });
        (dir, router)
    }

    fn body(action: &Action) -> Option<String> {
        match action {
            Action::Static(s) => s.contents.as_ref().map(|c| String::from_utf8_lossy(c).into_owned()),
            _ => None,
        }
    }

    #[test]
    fn test_target_parse() {
        assert_eq!("404".parse::<StaticTarget>(), Ok(StaticTarget::Status(StatusCode::NOT_FOUND)));
        assert_eq!(
            "staticDir:public".parse::<StaticTarget>(),
            Ok(StaticTarget::Directory(PathBuf::from("public")))
        );
        assert_eq!(
            "file: robots.txt".parse::<StaticTarget>(),
            Ok(StaticTarget::File(PathBuf::from("robots.txt")))
        );
        assert!("teapot".parse::<StaticTarget>().is_err());
    }

    #[test]
    fn test_directory_without_slash_redirects() {
        let (_dir, router) = fixture();
        match router.route(Verb::Get, "/assets") {
            Action::Static(s) => assert!(s.is_redirect()),
            other => panic!("expected redirect, got {other}"),
        }
        match router.route(Verb::Get, "/assets/docs") {
            Action::Static(s) => assert!(s.is_redirect()),
            other => panic!("expected redirect, got {other}"),
        }
    }

    #[test]
    fn test_directory_resolution() {
        let (_dir, router) = fixture();
        assert_eq!(body(&router.route(Verb::Get, "/assets/")).as_deref(), Some("<h1>home</h1>"));
        assert_eq!(body(&router.route(Verb::Get, "/assets/docs/")).as_deref(), Some("<h1>docs</h1>"));

        let script = router.route(Verb::Get, "/assets/app.js");
        match &script {
            Action::Static(s) => assert_eq!(s.content_type, "application/javascript"),
            other => panic!("expected file, got {other}"),
        }
        assert!(router.route(Verb::Get, "/assets/missing.css").is_null());
        assert!(router.route(Verb::Get, "/assets/../secret").is_null());
        assert!(router.route(Verb::Get, "/assets/./app.js").is_null());
        assert!(router.route(Verb::Post, "/assets/app.js").is_null());
    }

    #[test]
    fn test_absolute_remainder_stays_inside_directory() {
        let (_dir, router) = fixture();
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, "TOP-SECRET").unwrap();

        let path = format!("/assets/{}", secret.display());
        assert!(path.starts_with("/assets//"));
        assert!(router.route(Verb::Get, &path).is_null());
    }

    #[test]
    fn test_cached_contents_survive_file_removal() {
        let (dir, router) = fixture();
        assert!(body(&router.route(Verb::Get, "/assets/app.js")).is_some());
        fs::remove_file(dir.path().join("app.js")).unwrap();
        assert_eq!(body(&router.route(Verb::Get, "/assets/app.js")).as_deref(), Some("console.log(1)"));
    }

    #[test]
    fn test_status_entry() {
        let (_dir, router) = fixture();
        match router.route(Verb::Get, "/gone") {
            Action::Status(s) => assert_eq!(s.status, StatusCode::GONE),
            other => panic!("expected status, got {other}"),
        }
        assert_eq!(router.entries()[&Verb::Get]["/gone"], "410");
    }
}
