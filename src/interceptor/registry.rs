//! Per-type aspect declarations and their resolution into ordered sets.

use std::collections::HashMap;
use std::sync::Arc;

use crate::interceptor::{Interceptor, InterceptorSet};

#[derive(Default)]
pub struct InterceptorRegistry {
    declared: HashMap<String, Vec<Arc<Interceptor>>>,
    uses: HashMap<String, Vec<String>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an aspect on its owning type. Returns false when the same
    /// (owner, method) was already registered; the original keeps its place.
    pub fn register(&mut self, interceptor: Interceptor) -> bool {
        let list = self.declared.entry(interceptor.owner.clone()).or_default();
        if list.iter().any(|existing| existing.same_identity(&interceptor)) {
            return false;
        }

        tracing::debug!(
            interceptor = %interceptor.name(),
            kind = interceptor.kind.as_str(),
            priority = interceptor.priority,
            "Registered interceptor"
        );
        list.push(Arc::new(interceptor));
        true
    }

    /// Attach companion aspect types to a handler type, in order.
    pub fn uses_aspects<I, S>(&mut self, handler_type: &str, companions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.uses.entry(handler_type.to_string()).or_default();
        for companion in companions {
            let companion = companion.into();
            if !list.contains(&companion) {
                list.push(companion);
            }
        }
    }

    /// Aspects for `handler_type`: its own, then each companion's, sorted by
    /// priority with ties kept in that order.
    pub fn resolve(&self, handler_type: &str) -> InterceptorSet {
        let companions = self
            .uses
            .get(handler_type)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut set = InterceptorSet::default();
        for owner in std::iter::once(handler_type).chain(companions.iter().map(String::as_str)) {
            for interceptor in self.declared.get(owner).into_iter().flatten() {
                set.insert(interceptor.clone());
            }
        }
        set.sort();
        set
    }

    /// `resolve` narrowed to aspects applicable to an action's markers.
    pub fn resolve_for(&self, handler_type: &str, markers: &[&str]) -> InterceptorSet {
        self.resolve(handler_type).filtered(markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::method::{Call, Reply};
    use crate::interceptor::AspectKind;

    fn aspect(owner: &str, method: &str, priority: i32) -> Interceptor {
        Interceptor::new(owner, method, AspectKind::Before, |_call: &mut Call<'_>| Ok(Reply::empty()))
            .with_priority(priority)
    }

    fn names(set: &InterceptorSet) -> Vec<String> {
        set.get(AspectKind::Before).iter().map(|i| i.name()).collect()
    }

    #[test]
    fn test_own_then_companions_by_priority() {
        let mut registry = InterceptorRegistry::new();
        registry.register(aspect("Users", "own", 2));
        registry.register(aspect("Audit", "audit", 1));
        registry.register(aspect("Auth", "auth", 1));
        registry.register(aspect("Auth", "late", 9));
        registry.uses_aspects("Users", ["Audit", "Auth"]);

        assert_eq!(
            names(&registry.resolve("Users")),
            vec!["Audit#audit", "Auth#auth", "Users#own", "Auth#late"]
        );
    }

    #[test]
    fn test_reregistration_keeps_order() {
        let mut registry = InterceptorRegistry::new();
        registry.register(aspect("Users", "a", 0));
        registry.register(aspect("Users", "b", 0));
        let before = names(&registry.resolve("Users"));

        assert!(!registry.register(aspect("Users", "a", 0)));
        registry.uses_aspects("Users", ["Users"]);
        assert_eq!(names(&registry.resolve("Users")), before);
    }

    #[test]
    fn test_resolve_for_filters_markers() {
        let mut registry = InterceptorRegistry::new();
        registry.register(aspect("Users", "secured", 0).only(["Secured"]));
        registry.register(aspect("Users", "open", 1));

        assert_eq!(names(&registry.resolve_for("Users", &["Get"])), vec!["Users#open"]);
        assert_eq!(
            names(&registry.resolve_for("Users", &["Secured"])),
            vec!["Users#secured", "Users#open"]
        );
    }
}
