//! Route lookup across the literal table and the handler trie.
//!
//! # Responsibilities
//! - Ask each sub-router in order, first non-Null wins
//! - Memoize results (including Null) in the sharded route cache
//! - List every route for startup logging
//!
//! # Design Decisions
//! - Immutable after construction apart from the cache
//! - Explicit `Action::Null` rather than an error for "no route"

use std::collections::BTreeMap;

use crate::action::{Action, Verb};
use crate::routing::cache::RouteCache;
use crate::routing::static_router::StaticRouter;
use crate::routing::tree::Tree;

/// A source of actions.
pub trait Router: Send + Sync {
    fn route(&self, verb: Verb, path: &str) -> Action;

    /// `VERB → path → target` listing.
    fn entries(&self) -> BTreeMap<Verb, BTreeMap<String, String>>;
}

impl Router for Tree {
    fn route(&self, verb: Verb, path: &str) -> Action {
        self.find(verb, path)
    }

    fn entries(&self) -> BTreeMap<Verb, BTreeMap<String, String>> {
        self.patterns()
            .into_iter()
            .map(|(verb, routes)| {
                let routes = routes
                    .into_iter()
                    .map(|(pattern, action)| (pattern, action.to_string()))
                    .collect();
                (verb, routes)
            })
            .collect()
    }
}

impl Router for StaticRouter {
    fn route(&self, verb: Verb, path: &str) -> Action {
        StaticRouter::route(self, verb, path)
    }

    fn entries(&self) -> BTreeMap<Verb, BTreeMap<String, String>> {
        StaticRouter::entries(self)
    }
}

pub struct HttpRouter {
    routers: Vec<Box<dyn Router>>,
    cache: Option<RouteCache>,
}

impl HttpRouter {
    /// Literal table first, then the trie.
    pub fn new(static_router: StaticRouter, tree: Tree, cache_capacity: usize) -> Self {
        Self {
            routers: vec![Box::new(static_router), Box::new(tree)],
            cache: RouteCache::new(cache_capacity),
        }
    }

    pub fn route(&self, verb: Verb, path: &str) -> Action {
        let Some(cache) = &self.cache else {
            return self.resolve(verb, path);
        };

        let key = RouteCache::key(verb, path);
        if let Some(hit) = cache.get(&key) {
            return hit;
        }

        let action = self.resolve(verb, path);
        cache.insert(key, action.clone());
        action
    }

    fn resolve(&self, verb: Verb, path: &str) -> Action {
        self.routers
            .iter()
            .map(|router| router.route(verb, path))
            .find(|action| !action.is_null())
            .unwrap_or(Action::Null)
    }

    /// Every route, sorted by verb then path. Earlier sub-routers shadow later ones.
    pub fn entries(&self) -> BTreeMap<Verb, BTreeMap<String, String>> {
        let mut out: BTreeMap<Verb, BTreeMap<String, String>> = BTreeMap::new();
        for router in &self.routers {
            for (verb, routes) in router.entries() {
                let slot = out.entry(verb).or_default();
                for (path, target) in routes {
                    slot.entry(path).or_insert(target);
                }
            }
        }
        out
    }

    pub fn log_routes(&self) {
        for (verb, routes) in self.entries() {
            for (path, target) in routes {
                tracing::info!(verb = %verb, path = %path, target = %target, "Route");
            }
        }
    }
}
