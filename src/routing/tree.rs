//! Per-verb segment trie for handler routes.
//!
//! # Design Decisions
//! - `{name}` segments share a single wildcard child per node
//! - Lookup never backtracks: a literal child always wins, even when the
//!   wildcard branch would have matched further down
//! - Empty segments are dropped, so `/users/` and `/users` are the same route

use std::collections::{BTreeMap, HashMap};

use crate::action::{Action, Verb};

const WILDCARD: &str = "*";

/// Name inside a `{name}` segment, if the segment is a placeholder.
pub fn placeholder_name(segment: &str) -> Option<&str> {
    let name = segment.strip_prefix('{')?.strip_suffix('}')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some(name)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("route {verb} {pattern} is already registered")]
pub struct DuplicateRoute {
    pub verb: Verb,
    pub pattern: String,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    terminal: Option<(String, Action)>,
}

#[derive(Debug, Default)]
pub struct Tree {
    roots: HashMap<Verb, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, verb: Verb, pattern: &str, action: Action) -> Result<(), DuplicateRoute> {
        let mut node = self.roots.entry(verb).or_default();
        for segment in segments(pattern) {
            let key = if placeholder_name(segment).is_some() { WILDCARD } else { segment };
            node = node.children.entry(key.to_string()).or_default();
        }

        if node.terminal.is_some() {
            return Err(DuplicateRoute {
                verb,
                pattern: pattern.to_string(),
            });
        }
        node.terminal = Some((pattern.to_string(), action));
        Ok(())
    }

    /// Action at `path`, or `Action::Null`.
    pub fn find(&self, verb: Verb, path: &str) -> Action {
        let Some(mut node) = self.roots.get(&verb) else {
            return Action::Null;
        };

        for segment in segments(path) {
            match node.children.get(segment).or_else(|| node.children.get(WILDCARD)) {
                Some(child) => node = child,
                None => return Action::Null,
            }
        }

        node.terminal
            .as_ref()
            .map(|(_, action)| action.clone())
            .unwrap_or(Action::Null)
    }

    /// Registered patterns per verb, sorted.
    pub fn patterns(&self) -> BTreeMap<Verb, BTreeMap<String, Action>> {
        fn walk(node: &Node, out: &mut BTreeMap<String, Action>) {
            if let Some((pattern, action)) = &node.terminal {
                out.insert(pattern.clone(), action.clone());
            }
            for child in node.children.values() {
                walk(child, out);
            }
        }

        self.roots
            .iter()
            .map(|(verb, root)| {
                let mut out = BTreeMap::new();
                walk(root, &mut out);
                (*verb, out)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::StatusAction;
    use axum::http::StatusCode;

    fn marker(code: u16) -> Action {
        Action::Status(StatusAction {
            path: String::new(),
            status: StatusCode::from_u16(code).unwrap(),
        })
    }

    fn code(action: Action) -> Option<u16> {
        match action {
            Action::Status(s) => Some(s.status.as_u16()),
            _ => None,
        }
    }

    #[test]
    fn test_placeholder_name() {
        assert_eq!(placeholder_name("{id}"), Some("id"));
        assert_eq!(placeholder_name("{post-id_2}"), Some("post-id_2"));
        assert_eq!(placeholder_name("{}"), None);
        assert_eq!(placeholder_name("{a b}"), None);
        assert_eq!(placeholder_name("id"), None);
    }

    #[test]
    fn test_literal_beats_wildcard() {
        let mut tree = Tree::new();
        tree.insert(Verb::Get, "/users/{id}", marker(201)).unwrap();
        tree.insert(Verb::Get, "/users/me", marker(202)).unwrap();

        assert_eq!(code(tree.find(Verb::Get, "/users/me")), Some(202));
        assert_eq!(code(tree.find(Verb::Get, "/users/42")), Some(201));
        assert_eq!(code(tree.find(Verb::Get, "/users/42/")), Some(201));
        assert!(tree.find(Verb::Post, "/users/42").is_null());
        assert!(tree.find(Verb::Get, "/users").is_null());
    }

    #[test]
    fn test_no_backtracking() {
        let mut tree = Tree::new();
        tree.insert(Verb::Get, "/files/{name}/raw", marker(200)).unwrap();
        tree.insert(Verb::Get, "/files/latest", marker(204)).unwrap();

        // the literal branch is taken and has no `raw` child
        assert!(tree.find(Verb::Get, "/files/latest/raw").is_null());
        assert_eq!(code(tree.find(Verb::Get, "/files/a/raw")), Some(200));
    }

    #[test]
    fn test_duplicate_route() {
        let mut tree = Tree::new();
        tree.insert(Verb::Get, "/users/{id}", marker(200)).unwrap();
        let err = tree.insert(Verb::Get, "/users/{name}", marker(200)).unwrap_err();
        assert_eq!(err.pattern, "/users/{name}");
        assert!(tree.insert(Verb::Delete, "/users/{id}", marker(200)).is_ok());
    }

    #[test]
    fn test_patterns_listing() {
        let mut tree = Tree::new();
        tree.insert(Verb::Get, "/b", marker(200)).unwrap();
        tree.insert(Verb::Get, "/a/{x}", marker(200)).unwrap();
        tree.insert(Verb::Post, "/", marker(200)).unwrap();

        let listing = tree.patterns();
        let get: Vec<_> = listing[&Verb::Get].keys().cloned().collect();
        assert_eq!(get, vec!["/a/{x}", "/b"]);
        assert!(listing[&Verb::Post].contains_key("/"));
    }
}
